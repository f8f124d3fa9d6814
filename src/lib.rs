//! Harvest: a deterministic state machine with managed side effects
//!
//! Harvest follows the "pure core, imperative shell" split. Transitions are
//! pure functions from an input and the current state to the next state and
//! an [`Effect`](effects::Effect) describing asynchronous work. The
//! [`Harvester`](runtime::Harvester) runtime is the shell: it serializes all
//! inputs, commits transitions one at a time, schedules effects on named
//! queues and feeds their results back as new inputs.
//!
//! # Core Concepts
//!
//! - **Mappings**: pure transition functions, combined by reduction policies
//! - **Effects**: monoidal descriptions of tasks and cancellations
//! - **Queues**: closed sets of lanes, each flattened by one strategy
//!   (`merge`, `concat`, `latest`, `throttle`, `debounce`)
//! - **Replies**: exactly one per consumed input, in processing order
//!
//! # Example
//!
//! ```rust
//! use harvest::builder::TransitionBuilder;
//! use harvest::core::{EffectMapping, Reduce, Reply};
//! use harvest::effect_queue;
//! use harvest::effects::{Effect, FlattenStrategy};
//! use harvest::runtime::Harvester;
//! use futures::StreamExt;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum Input {
//!     Login,
//!     LoginOk,
//! }
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum Auth {
//!     LoggedOut,
//!     LoggingIn,
//!     LoggedIn,
//! }
//!
//! effect_queue! {
//!     enum Queue {
//!         Request => FlattenStrategy::latest(),
//!     }
//!     default: Request
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let login: EffectMapping<Input, Auth, Queue> = TransitionBuilder::new()
//!     .on(Input::Login)
//!     .from(Auth::LoggedOut)
//!     .to(Auth::LoggingIn)
//!     .effect(|| Effect::future(async { Input::LoginOk }))
//!     .build()
//!     .unwrap();
//! let login_ok = TransitionBuilder::new()
//!     .on(Input::LoginOk)
//!     .from(Auth::LoggingIn)
//!     .to(Auth::LoggedIn)
//!     .build()
//!     .unwrap();
//!
//! let harvester = Harvester::with_effects(
//!     Auth::LoggedOut,
//!     Effect::empty(),
//!     futures::stream::pending(),
//!     EffectMapping::reduce(Reduce::First, vec![login, login_ok]),
//! );
//! let mut replies = harvester.replies();
//!
//! harvester.send(Input::Login).unwrap();
//!
//! assert_eq!(replies.next().await.unwrap().to_state(), Some(&Auth::LoggingIn));
//! assert_eq!(replies.next().await.unwrap().to_state(), Some(&Auth::LoggedIn));
//! # }
//! ```

pub mod builder;
pub mod core;
pub mod effects;
pub mod runtime;

// Re-export commonly used types
pub use builder::{BuildError, HarvesterBuilder, TransitionBuilder};
pub use core::{EffectMapping, Guard, Mapping, Reduce, Reply};
pub use effects::{BasicEffectQueue, Effect, EffectQueue, FlattenStrategy, Task};
pub use runtime::{Harvester, HarvesterConfig, HarvesterError};
