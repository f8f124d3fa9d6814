//! Builder for constructing guarded transitions.

use crate::builder::error::BuildError;
use crate::core::{EffectMapping, Guard};
use crate::effects::{BasicEffectQueue, Effect, EffectQueue};
use std::sync::Arc;

/// Computes the target state from the matched input and source state.
type Update<I, S> = Arc<dyn Fn(&I, &S) -> S + Send + Sync>;

/// Produces a fresh effect for every accepted input.
type EffectFactory<I, Q, Id, W> = Arc<dyn Fn(&W) -> Effect<I, Q, Id> + Send + Sync>;

/// Builder for one `input | from => to + effect` rule.
///
/// The built [`EffectMapping`] accepts an input when both the input guard
/// and the source-state guard pass, and rejects it otherwise. Several rules
/// are combined with [`EffectMapping::reduce`].
///
/// # Example
///
/// ```rust
/// use harvest::builder::TransitionBuilder;
/// use harvest::core::EffectMapping;
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum Input { Login, Logout }
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum Auth { LoggedOut, LoggedIn }
///
/// let login: EffectMapping<Input, Auth> = TransitionBuilder::new()
///     .on(Input::Login)
///     .from(Auth::LoggedOut)
///     .to(Auth::LoggedIn)
///     .build()
///     .unwrap();
///
/// assert!(login.run(&Input::Login, &Auth::LoggedOut, &()).is_some());
/// assert!(login.run(&Input::Logout, &Auth::LoggedOut, &()).is_none());
/// assert!(login.run(&Input::Login, &Auth::LoggedIn, &()).is_none());
/// ```
pub struct TransitionBuilder<I, S, Q = BasicEffectQueue, Id = (), W = ()> {
    input: Option<Guard<I>>,
    from: Option<Guard<S>>,
    to: Option<Update<I, S>>,
    effect: Option<EffectFactory<I, Q, Id, W>>,
}

impl<I, S, Q, Id, W> TransitionBuilder<I, S, Q, Id, W>
where
    I: 'static,
    S: 'static,
    Q: EffectQueue,
    Id: 'static,
    W: 'static,
{
    /// Create a new transition builder.
    pub fn new() -> Self {
        Self {
            input: None,
            from: None,
            to: None,
            effect: None,
        }
    }

    /// Match exactly `input`.
    pub fn on(self, input: I) -> Self
    where
        I: PartialEq + Send + Sync,
    {
        self.input_guard(Guard::eq(input))
    }

    /// Match inputs accepted by `predicate`.
    pub fn when_input<F>(self, predicate: F) -> Self
    where
        F: Fn(&I) -> bool + Send + Sync + 'static,
    {
        self.input_guard(Guard::new(predicate))
    }

    /// Match inputs accepted by a prepared guard.
    pub fn input_guard(mut self, guard: Guard<I>) -> Self {
        self.input = Some(guard);
        self
    }

    /// Apply only in exactly `state`.
    pub fn from(self, state: S) -> Self
    where
        S: PartialEq + Send + Sync,
    {
        self.guard(Guard::eq(state))
    }

    /// Apply in states accepted by `predicate`.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::new(predicate))
    }

    /// Apply in every state.
    pub fn from_any(self) -> Self {
        self.guard(Guard::any())
    }

    /// Apply in states accepted by a prepared guard.
    pub fn guard(mut self, guard: Guard<S>) -> Self {
        self.from = Some(guard);
        self
    }

    /// Move to a fixed target state.
    pub fn to(self, state: S) -> Self
    where
        S: Clone + Send + Sync,
    {
        self.update(move |_, _| state.clone())
    }

    /// Compute the target state from the input and the source state.
    pub fn update<F>(mut self, f: F) -> Self
    where
        F: Fn(&I, &S) -> S + Send + Sync + 'static,
    {
        self.to = Some(Arc::new(f));
        self
    }

    /// Schedule a fresh effect on every accepted input (optional).
    pub fn effect<F>(self, factory: F) -> Self
    where
        F: Fn() -> Effect<I, Q, Id> + Send + Sync + 'static,
    {
        self.effect_with(move |_| factory())
    }

    /// Schedule an effect built from the World on every accepted input
    /// (optional).
    pub fn effect_with<F>(mut self, factory: F) -> Self
    where
        F: Fn(&W) -> Effect<I, Q, Id> + Send + Sync + 'static,
    {
        self.effect = Some(Arc::new(factory));
        self
    }

    /// Build the transition.
    pub fn build(self) -> Result<EffectMapping<I, S, Q, Id, W>, BuildError> {
        let input = self.input.ok_or(BuildError::MissingInput)?;
        let from = self.from.ok_or(BuildError::MissingFromState)?;
        let to = self.to.ok_or(BuildError::MissingToState)?;
        let effect = self.effect;

        Ok(EffectMapping::new(move |i, s, world| {
            if !input.check(i) || !from.check(s) {
                return None;
            }
            let effect = effect
                .as_ref()
                .map_or_else(Effect::empty, |factory| factory(world));
            Some((to(i, s), effect))
        }))
    }
}

impl<I, S, Q, Id, W> Default for TransitionBuilder<I, S, Q, Id, W>
where
    I: 'static,
    S: 'static,
    Q: EffectQueue,
    Id: 'static,
    W: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
