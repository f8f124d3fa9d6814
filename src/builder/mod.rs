//! Builder API for ergonomic harvester construction.
//!
//! This module provides fluent builders and macros for creating transitions
//! and starting harvesters with minimal boilerplate while keeping every
//! type parameter checked.

pub mod error;
pub mod harvester;
pub mod macros;
pub mod transition;

pub use error::BuildError;
pub use harvester::HarvesterBuilder;
pub use transition::TransitionBuilder;

use crate::core::EffectMapping;
use crate::effects::{Effect, EffectQueue};

/// Create a transition from one input and state to a target state.
///
/// # Example
///
/// ```
/// use harvest::builder::transition;
/// use harvest::core::EffectMapping;
///
/// let open: EffectMapping<&str, &str> = transition("open", "closed", "open");
///
/// assert_eq!(open.run(&"open", &"closed", &()).map(|(s, _)| s), Some("open"));
/// assert!(open.run(&"open", &"open", &()).is_none());
/// ```
pub fn transition<I, S, Q, Id, W>(input: I, from: S, to: S) -> EffectMapping<I, S, Q, Id, W>
where
    I: PartialEq + Send + Sync + 'static,
    S: Clone + PartialEq + Send + Sync + 'static,
    Q: EffectQueue,
    Id: 'static,
    W: 'static,
{
    guarded_transition(move |i| *i == input, move |s| *s == from, to)
}

/// Create a transition whose input and source state are matched by
/// predicates.
///
/// # Example
///
/// ```
/// use harvest::builder::guarded_transition;
/// use harvest::core::EffectMapping;
///
/// let raise: EffectMapping<u32, u32> = guarded_transition(|i| *i > 10, |s| *s < 3, 3);
///
/// assert!(raise.run(&11, &0, &()).is_some());
/// assert!(raise.run(&5, &0, &()).is_none());
/// assert!(raise.run(&11, &3, &()).is_none());
/// ```
pub fn guarded_transition<I, S, Q, Id, W, G, H>(
    input: G,
    from: H,
    to: S,
) -> EffectMapping<I, S, Q, Id, W>
where
    I: 'static,
    S: Clone + Send + Sync + 'static,
    Q: EffectQueue,
    Id: 'static,
    W: 'static,
    G: Fn(&I) -> bool + Send + Sync + 'static,
    H: Fn(&S) -> bool + Send + Sync + 'static,
{
    EffectMapping::new(move |i, s, _| {
        (input(i) && from(s)).then(|| (to.clone(), Effect::empty()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Reduce;

    #[derive(Clone, Debug, PartialEq)]
    enum Door {
        Open,
        Closed,
        Locked,
    }

    #[test]
    fn transition_matches_exact_input_and_state() {
        let close: EffectMapping<&str, Door> = transition("close", Door::Open, Door::Closed);

        let (next, effect) = close.run(&"close", &Door::Open, &()).unwrap();
        assert_eq!(next, Door::Closed);
        assert!(effect.is_empty());

        assert!(close.run(&"close", &Door::Closed, &()).is_none());
        assert!(close.run(&"lock", &Door::Open, &()).is_none());
    }

    #[test]
    fn transitions_reduce_into_one_machine() {
        let door: EffectMapping<&str, Door> = EffectMapping::reduce(
            Reduce::First,
            vec![
                transition("close", Door::Open, Door::Closed),
                transition("open", Door::Closed, Door::Open),
                transition("lock", Door::Closed, Door::Locked),
                guarded_transition(|i: &&str| *i == "kick", |_| true, Door::Open),
            ],
        );

        let run = |input, state| door.run(&input, &state, &()).map(|(next, _)| next);
        assert_eq!(run("lock", Door::Closed), Some(Door::Locked));
        assert_eq!(run("open", Door::Locked), None);
        assert_eq!(run("kick", Door::Locked), Some(Door::Open));
    }
}
