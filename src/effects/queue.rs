//! Effect queues and their flatten strategies.

use std::fmt::Debug;
use std::time::Duration;

/// Describes how the result streams of the tasks arriving on one queue are
/// combined into a single stream of inputs.
///
/// Strategies are immutable and built through the named constructors only.
///
/// # Example
///
/// ```rust
/// use harvest::effects::FlattenStrategy;
/// use std::time::Duration;
///
/// let search = FlattenStrategy::debounce(Duration::from_millis(300));
/// let upload = FlattenStrategy::concat();
///
/// assert_ne!(search, upload);
/// assert_eq!(FlattenStrategy::concurrent(1), FlattenStrategy::concat());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlattenStrategy {
    pub(crate) kind: Kind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Kind {
    /// At most `limit` running tasks; `None` is unbounded.
    Concurrent { limit: Option<usize> },
    Latest,
    Throttle {
        interval: Duration,
        prefer_latest: bool,
    },
    Debounce {
        interval: Duration,
    },
}

impl FlattenStrategy {
    /// Run every task as soon as it arrives, forwarding values as they come.
    pub const fn merge() -> Self {
        FlattenStrategy {
            kind: Kind::Concurrent { limit: None },
        }
    }

    /// Run one task at a time, in arrival order.
    pub const fn concat() -> Self {
        FlattenStrategy {
            kind: Kind::Concurrent { limit: Some(1) },
        }
    }

    /// Run at most `max` tasks at a time; later arrivals wait in FIFO order.
    ///
    /// A `max` of zero is treated as one.
    pub fn concurrent(max: usize) -> Self {
        FlattenStrategy {
            kind: Kind::Concurrent {
                limit: Some(max.max(1)),
            },
        }
    }

    /// Cancel the running task whenever a new one arrives.
    pub const fn latest() -> Self {
        FlattenStrategy { kind: Kind::Latest }
    }

    /// Forward at most one task per `interval` window and drop the rest.
    ///
    /// A window opens when a task arrives while none is open. With
    /// `prefer_latest = false` that first task runs immediately; with
    /// `prefer_latest = true` the most recent task of the window runs when
    /// the window closes, so even a lone task on an idle lane waits a full
    /// `interval`. Trailing-edge throttles that emit the first element at
    /// once and the latest at the end are not modelled.
    pub const fn throttle(interval: Duration, prefer_latest: bool) -> Self {
        FlattenStrategy {
            kind: Kind::Throttle {
                interval,
                prefer_latest,
            },
        }
    }

    /// Run a task only once `interval` has passed without another arrival.
    pub const fn debounce(interval: Duration) -> Self {
        FlattenStrategy {
            kind: Kind::Debounce { interval },
        }
    }

    /// Maximum number of simultaneously running tasks, `None` if unbounded.
    pub fn max_concurrency(&self) -> Option<usize> {
        match self.kind {
            Kind::Concurrent { limit } => limit,
            Kind::Latest => Some(1),
            Kind::Throttle { .. } | Kind::Debounce { .. } => None,
        }
    }
}

impl Default for FlattenStrategy {
    fn default() -> Self {
        FlattenStrategy::merge()
    }
}

/// Named lane that tasks are grouped by before flattening.
///
/// The set of queues is closed and enumerable: `all_queues` lists every
/// lane, and must include `default_queue`. Closed enums are most easily
/// declared with [`effect_queue!`](crate::effect_queue).
pub trait EffectQueue: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Strategy used to flatten the tasks of this lane.
    fn flatten_strategy(&self) -> FlattenStrategy;

    /// Lane used by tasks that do not name one.
    fn default_queue() -> Self;

    /// Every lane, used to set up routing when a harvester starts.
    fn all_queues() -> Vec<Self>;
}

/// Single queue with the `merge` strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BasicEffectQueue;

impl EffectQueue for BasicEffectQueue {
    fn flatten_strategy(&self) -> FlattenStrategy {
        FlattenStrategy::merge()
    }

    fn default_queue() -> Self {
        BasicEffectQueue
    }

    fn all_queues() -> Vec<Self> {
        vec![BasicEffectQueue]
    }
}
