//! Transition functions.
//!
//! A [`Mapping`] computes the next state for an input, an [`EffectMapping`]
//! additionally returns an [`Effect`] to schedule. Returning `None` rejects
//! the input. Both are pure: all asynchronous work goes into the effect.

use crate::effects::{BasicEffectQueue, Effect, EffectQueue};
use std::sync::Arc;

/// How several mappings are folded into one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Reduce {
    /// The first mapping that accepts wins; later ones are not evaluated.
    #[default]
    First,

    /// Every mapping must accept. The state is threaded through them in
    /// order and a single rejection rejects the whole input.
    TryAll,

    /// Every accepting mapping is applied in order, rejecting ones are
    /// skipped. Accepts if at least one mapping accepted; the effects of the
    /// accepting mappings are combined.
    All,
}

type MappingFn<I, S> = dyn Fn(&I, &S) -> Option<S> + Send + Sync;

/// State transition function without effects.
///
/// # Example
///
/// ```rust
/// use harvest::core::Mapping;
///
/// let count = Mapping::new(|delta: &i32, total: &i32| Some(total + delta));
/// let positive_only = Mapping::new(|delta: &i32, total: &i32| {
///     (*delta > 0).then(|| total + delta)
/// });
///
/// assert_eq!(count.run(&-2, &5), Some(3));
/// assert_eq!(positive_only.run(&-2, &5), None);
/// ```
pub struct Mapping<I, S> {
    run: Arc<MappingFn<I, S>>,
}

impl<I, S> Mapping<I, S>
where
    I: 'static,
    S: 'static,
{
    pub fn new<F>(run: F) -> Self
    where
        F: Fn(&I, &S) -> Option<S> + Send + Sync + 'static,
    {
        Mapping { run: Arc::new(run) }
    }

    /// Evaluate the mapping; `None` rejects the input.
    pub fn run(&self, input: &I, state: &S) -> Option<S> {
        (self.run)(input, state)
    }

    /// Mapping that rejects every input.
    pub fn reject() -> Self {
        Mapping::new(|_, _| None)
    }

    /// Lift into an [`EffectMapping`] producing the empty effect.
    pub fn into_effect_mapping<Q, Id, W>(self) -> EffectMapping<I, S, Q, Id, W>
    where
        Q: 'static,
        Id: 'static,
        W: 'static,
    {
        EffectMapping::new(move |input, state, _world| {
            self.run(input, state).map(|next| (next, Effect::empty()))
        })
    }

    /// Fold several mappings into one according to `policy`.
    pub fn reduce<T>(policy: Reduce, mappings: T) -> Self
    where
        T: IntoIterator<Item = Mapping<I, S>>,
        S: Clone,
    {
        let mappings: Vec<Mapping<I, S>> = mappings.into_iter().collect();

        match policy {
            Reduce::First => Mapping::new(move |input, state| {
                mappings.iter().find_map(|mapping| mapping.run(input, state))
            }),
            Reduce::TryAll => Mapping::new(move |input, state: &S| {
                mappings
                    .iter()
                    .try_fold(state.clone(), |current, mapping| mapping.run(input, &current))
            }),
            Reduce::All => Mapping::new(move |input, state: &S| {
                let mut current = state.clone();
                let mut accepted = false;
                for mapping in &mappings {
                    if let Some(next) = mapping.run(input, &current) {
                        current = next;
                        accepted = true;
                    }
                }
                accepted.then_some(current)
            }),
        }
    }
}

impl<I, S> Clone for Mapping<I, S> {
    fn clone(&self) -> Self {
        Mapping {
            run: Arc::clone(&self.run),
        }
    }
}

type EffectMappingFn<I, S, Q, Id, W> =
    dyn Fn(&I, &S, &W) -> Option<(S, Effect<I, Q, Id>)> + Send + Sync;

/// State transition function that also produces an [`Effect`].
///
/// `W` is the world: an externally supplied dependency bundle handed
/// unchanged to every evaluation, so tasks can be built from real or test
/// resources without the engine knowing which.
///
/// # Example
///
/// ```rust
/// use harvest::core::EffectMapping;
/// use harvest::effects::{BasicEffectQueue, Effect};
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum Input {
///     Ping,
///     Pong,
/// }
///
/// let mapping: EffectMapping<Input, u32> = EffectMapping::new(|input, count, _world| {
///     match input {
///         Input::Ping => Some((count + 1, Effect::future(async { Input::Pong }))),
///         Input::Pong => Some((count + 1, Effect::empty())),
///     }
/// });
///
/// let (next, effect) = mapping.run(&Input::Ping, &0, &()).unwrap();
/// assert_eq!(next, 1);
/// assert_eq!(effect.task_count(), 1);
/// ```
pub struct EffectMapping<I, S, Q = BasicEffectQueue, Id = (), W = ()> {
    run: Arc<EffectMappingFn<I, S, Q, Id, W>>,
}

impl<I, S, Q, Id, W> EffectMapping<I, S, Q, Id, W>
where
    I: 'static,
    S: 'static,
    Q: 'static,
    Id: 'static,
    W: 'static,
{
    pub fn new<F>(run: F) -> Self
    where
        F: Fn(&I, &S, &W) -> Option<(S, Effect<I, Q, Id>)> + Send + Sync + 'static,
    {
        EffectMapping { run: Arc::new(run) }
    }

    /// Evaluate the mapping; `None` rejects the input.
    pub fn run(&self, input: &I, state: &S, world: &W) -> Option<(S, Effect<I, Q, Id>)> {
        (self.run)(input, state, world)
    }

    /// Mapping that rejects every input.
    pub fn reject() -> Self {
        EffectMapping::new(|_, _, _| None)
    }

    /// Fold several mappings into one according to `policy`.
    ///
    /// With [`Reduce::TryAll`] and [`Reduce::All`] the effects of the
    /// accepting mappings are combined in evaluation order.
    pub fn reduce<T>(policy: Reduce, mappings: T) -> Self
    where
        T: IntoIterator<Item = EffectMapping<I, S, Q, Id, W>>,
        S: Clone,
    {
        let mappings: Vec<EffectMapping<I, S, Q, Id, W>> = mappings.into_iter().collect();

        match policy {
            Reduce::First => EffectMapping::new(move |input, state, world| {
                mappings
                    .iter()
                    .find_map(|mapping| mapping.run(input, state, world))
            }),
            Reduce::TryAll => EffectMapping::new(move |input, state: &S, world| {
                mappings.iter().try_fold(
                    (state.clone(), Effect::empty()),
                    |(current, effect), mapping| {
                        let (next, more) = mapping.run(input, &current, world)?;
                        Some((next, effect.combine(more)))
                    },
                )
            }),
            Reduce::All => EffectMapping::new(move |input, state: &S, world| {
                let mut current = state.clone();
                let mut effect = Effect::empty();
                let mut accepted = false;
                for mapping in &mappings {
                    if let Some((next, more)) = mapping.run(input, &current, world) {
                        current = next;
                        effect = effect.combine(more);
                        accepted = true;
                    }
                }
                accepted.then_some((current, effect))
            }),
        }
    }

    /// Transform the effect of every accepted transition.
    pub fn map_effect<Q2, Id2, F>(self, f: F) -> EffectMapping<I, S, Q2, Id2, W>
    where
        Q2: 'static,
        Id2: 'static,
        F: Fn(Effect<I, Q, Id>) -> Effect<I, Q2, Id2> + Send + Sync + 'static,
    {
        EffectMapping::new(move |input, state, world| {
            self.run(input, state, world)
                .map(|(next, effect)| (next, f(effect)))
        })
    }
}

impl<I, S, Q, Id, W> EffectMapping<I, S, Q, Id, W>
where
    I: 'static,
    S: 'static,
    Q: EffectQueue,
    Id: 'static,
    W: 'static,
{
    /// Pair a plain mapping with a fixed effect factory.
    ///
    /// The factory runs once per accepted input so each transition gets a
    /// fresh effect.
    pub fn with_effect<F>(mapping: Mapping<I, S>, effect: F) -> Self
    where
        F: Fn() -> Effect<I, Q, Id> + Send + Sync + 'static,
    {
        EffectMapping::new(move |input, state, _world| {
            mapping.run(input, state).map(|next| (next, effect()))
        })
    }
}

impl<I, S, Q, Id, W> Clone for EffectMapping<I, S, Q, Id, W> {
    fn clone(&self) -> Self {
        EffectMapping {
            run: Arc::clone(&self.run),
        }
    }
}

impl<I: 'static, S: 'static, Q: 'static, Id: 'static, W: 'static> From<Mapping<I, S>>
    for EffectMapping<I, S, Q, Id, W>
{
    fn from(mapping: Mapping<I, S>) -> Self {
        mapping.into_effect_mapping()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Op {
        Add(i32),
        Double,
    }

    fn add() -> Mapping<Op, i32> {
        Mapping::new(|op, total| match op {
            Op::Add(n) => Some(total + n),
            Op::Double => None,
        })
    }

    fn double() -> Mapping<Op, i32> {
        Mapping::new(|op, total| match op {
            Op::Double => Some(total * 2),
            Op::Add(_) => None,
        })
    }

    fn always_inc() -> Mapping<Op, i32> {
        Mapping::new(|_, total| Some(total + 1))
    }

    fn tagged(tag: &'static str, accept: bool) -> EffectMapping<Op, i32, BasicEffectQueue, &'static str> {
        EffectMapping::new(move |_, total, _| {
            accept.then(|| (total + 1, Effect::future(async { Op::Double }).with_id(tag)))
        })
    }

    #[test]
    fn first_uses_highest_priority_acceptor() {
        let mapping = Mapping::reduce(Reduce::First, [add(), always_inc()]);

        assert_eq!(mapping.run(&Op::Add(5), &1), Some(6));
        assert_eq!(mapping.run(&Op::Double, &1), Some(2));
    }

    #[test]
    fn first_rejects_when_nothing_accepts() {
        let mapping = Mapping::reduce(Reduce::First, [add(), double()]);
        let none = Mapping::<Op, i32>::reduce(Reduce::First, []);

        assert_eq!(mapping.run(&Op::Double, &3), Some(6));
        assert_eq!(none.run(&Op::Double, &3), None);
    }

    #[test]
    fn try_all_threads_state_and_aborts_on_rejection() {
        let both = Mapping::reduce(Reduce::TryAll, [add(), always_inc()]);
        let strict = Mapping::reduce(Reduce::TryAll, [add(), double()]);

        assert_eq!(both.run(&Op::Add(2), &1), Some(4));
        assert_eq!(strict.run(&Op::Add(2), &1), None);
    }

    #[test]
    fn all_skips_rejecting_mappings() {
        let mapping = Mapping::reduce(Reduce::All, [add(), double(), always_inc()]);
        let rejecting = Mapping::reduce(Reduce::All, [add(), Mapping::reject()]);

        assert_eq!(mapping.run(&Op::Add(2), &1), Some(4));
        assert_eq!(mapping.run(&Op::Double, &3), Some(7));
        assert_eq!(rejecting.run(&Op::Double, &3), None);
    }

    #[test]
    fn lifted_mapping_has_empty_effect() {
        let mapping: EffectMapping<Op, i32> = add().into_effect_mapping();

        let (next, effect) = mapping.run(&Op::Add(1), &1, &()).unwrap();
        assert_eq!(next, 2);
        assert!(effect.is_empty());
        assert!(mapping.run(&Op::Double, &1, &()).is_none());
    }

    #[test]
    fn all_combines_effects_of_acceptors() {
        let mapping = EffectMapping::reduce(
            Reduce::All,
            [tagged("a", true), tagged("b", false), tagged("c", true)],
        );

        let (next, effect) = mapping.run(&Op::Add(0), &0, &()).unwrap();
        let ids: Vec<_> = effect.tasks().iter().map(|t| t.id().copied()).collect();

        assert_eq!(next, 2);
        assert_eq!(ids, vec![Some("a"), Some("c")]);
    }

    #[test]
    fn try_all_discards_effects_on_rejection() {
        let accepted = EffectMapping::reduce(Reduce::TryAll, [tagged("a", true), tagged("b", true)]);
        let rejected = EffectMapping::reduce(Reduce::TryAll, [tagged("a", true), tagged("b", false)]);

        let (next, effect) = accepted.run(&Op::Add(0), &0, &()).unwrap();
        assert_eq!(next, 2);
        assert_eq!(effect.task_count(), 2);
        assert!(rejected.run(&Op::Add(0), &0, &()).is_none());
    }

    #[test]
    fn with_effect_builds_fresh_effect_per_transition() {
        let mapping: EffectMapping<Op, i32> =
            EffectMapping::with_effect(add(), || Effect::future(async { Op::Double }));

        let (_, first) = mapping.run(&Op::Add(1), &0, &()).unwrap();
        let (_, second) = mapping.run(&Op::Add(1), &0, &()).unwrap();

        assert_eq!(first.task_count(), 1);
        assert_eq!(second.task_count(), 1);
    }

    #[test]
    fn world_is_passed_through() {
        let mapping: EffectMapping<Op, i32, BasicEffectQueue, (), i32> =
            EffectMapping::new(|_, total, bonus| Some((total + bonus, Effect::empty())));

        assert_eq!(mapping.run(&Op::Double, &1, &10).map(|(s, _)| s), Some(11));
    }
}
