//! Builder for starting harvesters.

use crate::builder::error::BuildError;
use crate::core::EffectMapping;
use crate::effects::{BasicEffectQueue, Effect, EffectQueue};
use crate::runtime::driver::{self, Parts};
use crate::runtime::{Harvester, HarvesterConfig};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::fmt::Debug;

/// Builder for starting a [`Harvester`] with a fluent API.
///
/// Only the initial state and the mapping are required. Without
/// [`inputs`](HarvesterBuilder::inputs) the harvester is fed through
/// [`Harvester::send`] and effects alone, and runs until it is closed.
pub struct HarvesterBuilder<I, S, Q = BasicEffectQueue, Id = (), W = ()> {
    state: Option<S>,
    effect: Effect<I, Q, Id>,
    inputs: Option<BoxStream<'static, I>>,
    mapping: Option<EffectMapping<I, S, Q, Id, W>>,
    world: W,
    config: HarvesterConfig,
}

impl<I, S, Q, Id> HarvesterBuilder<I, S, Q, Id> {
    /// Create a new builder without a World.
    pub fn new() -> Self {
        Self::with_world(())
    }
}

impl<I, S, Q, Id, W> HarvesterBuilder<I, S, Q, Id, W> {
    /// Create a new builder whose mappings read `world`.
    pub fn with_world(world: W) -> Self {
        Self {
            state: None,
            effect: Effect::empty(),
            inputs: None,
            mapping: None,
            world,
            config: HarvesterConfig::default(),
        }
    }

    /// Set the initial state (required).
    pub fn state(mut self, state: S) -> Self {
        self.state = Some(state);
        self
    }

    /// Set the transition function (required).
    ///
    /// A plain [`Mapping`](crate::core::Mapping) converts into an effect
    /// mapping that never schedules work.
    pub fn mapping<M>(mut self, mapping: M) -> Self
    where
        M: Into<EffectMapping<I, S, Q, Id, W>>,
    {
        self.mapping = Some(mapping.into());
        self
    }

    /// Effect routed once at start-up, before any input is consumed.
    pub fn effect(mut self, effect: Effect<I, Q, Id>) -> Self {
        self.effect = effect;
        self
    }

    /// External input source. The harvester stops when it completes.
    pub fn inputs<St>(mut self, inputs: St) -> Self
    where
        St: Stream<Item = I> + Send + 'static,
    {
        self.inputs = Some(inputs.boxed());
        self
    }

    /// Replace the whole runtime configuration.
    pub fn config(mut self, config: HarvesterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    pub fn reply_capacity(mut self, capacity: usize) -> Self {
        self.config.reply_capacity = capacity;
        self
    }
}

impl<I, S, Q, Id, W> HarvesterBuilder<I, S, Q, Id, W>
where
    I: Clone + Debug + Send + 'static,
    S: Clone + Debug + Send + Sync + 'static,
    Q: EffectQueue,
    Id: Send + 'static,
    W: Send + 'static,
{
    /// Start the harvester. Must be called within a tokio runtime.
    pub fn build(self) -> Result<Harvester<I, S>, BuildError> {
        let state = self.state.ok_or(BuildError::MissingInitialState)?;
        let mapping = self.mapping.ok_or(BuildError::MissingMapping)?;

        if self.config.reply_capacity == 0 {
            return Err(BuildError::ZeroReplyCapacity);
        }

        Ok(driver::spawn(Parts {
            state,
            effect: self.effect,
            inputs: self.inputs.unwrap_or_else(|| stream::pending().boxed()),
            mapping,
            world: self.world,
            config: self.config,
        }))
    }
}

impl<I, S, Q, Id> Default for HarvesterBuilder<I, S, Q, Id> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Mapping, Reply};
    use crate::effect_queue;
    use crate::effects::{FlattenStrategy, Task};
    use std::time::Duration;
    use tokio::time;

    effect_queue! {
        enum Lane {
            Work => FlattenStrategy::merge(),
        }
        default: Work
    }

    fn counter() -> Mapping<i32, i32> {
        Mapping::new(|delta, total| Some(total + delta))
    }

    #[test]
    fn builder_validates_required_fields() {
        let result = HarvesterBuilder::<i32, i32>::new().mapping(counter()).build();
        assert!(matches!(result, Err(BuildError::MissingInitialState)));

        let result = HarvesterBuilder::<i32, i32>::new().state(0).build();
        assert!(matches!(result, Err(BuildError::MissingMapping)));
    }

    #[test]
    fn builder_rejects_zero_reply_capacity() {
        let result = HarvesterBuilder::<i32, i32>::new()
            .state(0)
            .mapping(counter())
            .reply_capacity(0)
            .build();

        assert!(matches!(result, Err(BuildError::ZeroReplyCapacity)));
    }

    #[tokio::test]
    async fn builder_starts_with_external_inputs() {
        let harvester = HarvesterBuilder::<i32, i32>::new()
            .state(10)
            .mapping(counter())
            .inputs(stream::iter(vec![1, 2, 3]))
            .label("counter")
            .build()
            .unwrap();

        let replies: Vec<_> = harvester.replies().collect().await;

        assert_eq!(replies.len(), 3);
        assert!(replies.iter().all(Reply::is_success));
        assert_eq!(harvester.state(), 16);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_effect_runs_without_reply() {
        let harvester = HarvesterBuilder::<i32, i32, Lane>::new()
            .state(0)
            .mapping(counter())
            .effect(Effect::future(async {
                time::sleep(Duration::from_secs(1)).await;
                5
            }))
            .build()
            .unwrap();
        let mut replies = harvester.replies();

        let reply = replies.next().await.unwrap();
        assert_eq!(
            reply,
            Reply::Success {
                input: 5,
                from: 0,
                to: 5
            }
        );
    }

    #[tokio::test]
    async fn world_reaches_mapping_and_tasks() {
        #[derive(Clone)]
        struct Env {
            bonus: i32,
        }

        let mapping: EffectMapping<i32, i32, Lane, (), Env> =
            EffectMapping::new(|delta: &i32, total: &i32, env: &Env| {
                let effect = if *delta == 0 {
                    let bonus = env.bonus;
                    Effect::task(Task::future(async move { bonus }))
                } else {
                    Effect::empty()
                };
                Some((total + delta, effect))
            });

        let harvester = HarvesterBuilder::<i32, i32, Lane, (), Env>::with_world(Env { bonus: 7 })
            .state(1)
            .mapping(mapping)
            .build()
            .unwrap();
        let mut replies = harvester.replies();

        harvester.send(0).unwrap();

        let mut states = Vec::new();
        for _ in 0..2 {
            states.extend(replies.next().await.and_then(|r| r.to_state().copied()));
        }
        assert_eq!(states, vec![1, 8]);
    }
}
