//! Managed side effects.
//!
//! Transitions describe asynchronous work as [`Effect`] values. A harvester
//! routes every task to its [`EffectQueue`], flattens each queue according
//! to its [`FlattenStrategy`], and feeds the produced values back as inputs.
//!
//! # Key Concepts
//!
//! - **Tasks**: cold input streams tagged with a queue and an optional id
//! - **Queues**: a closed set of lanes, each with one flatten strategy
//! - **Cancellation**: predicates over task ids, evaluated against every
//!   running task regardless of its queue

mod effect;
mod flatten;
mod queue;
pub(crate) mod router;

pub use effect::{CancelPredicate, Effect, Producer, Task};
pub use queue::{BasicEffectQueue, EffectQueue, FlattenStrategy};
