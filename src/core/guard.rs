//! Guard predicates for matching inputs and states.
//!
//! Guards are pure boolean functions that decide whether a transition
//! applies. The same type is used on both sides of a transition: a
//! `Guard<I>` selects inputs and a `Guard<S>` selects source states.

use std::fmt;
use std::sync::Arc;

/// Pure, shareable predicate over a value.
///
/// # Example
///
/// ```rust
/// use harvest::core::Guard;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Door {
///     Open,
///     Closed,
///     Locked,
/// }
///
/// let can_open = Guard::new(|door: &Door| !matches!(door, Door::Locked));
///
/// assert!(can_open.check(&Door::Closed));
/// assert!(can_open.check(&Door::Open));
/// assert!(!can_open.check(&Door::Locked));
/// ```
pub struct Guard<T> {
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> Guard<T> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and thread-safe (Send + Sync).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Guard that accepts every value.
    pub fn any() -> Self {
        Guard::new(|_| true)
    }

    /// Check the guard against a value.
    pub fn check(&self, value: &T) -> bool {
        (self.predicate)(value)
    }

    /// Guard that accepts a value when both guards do.
    pub fn and(self, other: Guard<T>) -> Self
    where
        T: 'static,
    {
        Guard::new(move |value| self.check(value) && other.check(value))
    }

    /// Guard that accepts a value when either guard does.
    pub fn or(self, other: Guard<T>) -> Self
    where
        T: 'static,
    {
        Guard::new(move |value| self.check(value) || other.check(value))
    }
}

impl<T> Guard<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    /// Guard that accepts exactly `expected`.
    pub fn eq(expected: T) -> Self {
        Guard::new(move |value| *value == expected)
    }
}

impl<T> Clone for Guard<T> {
    fn clone(&self) -> Self {
        Guard {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T> fmt::Debug for Guard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}
