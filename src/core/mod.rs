//! Core transition types.
//!
//! This module contains the pure part of the engine:
//! - Transition functions (`Mapping`, `EffectMapping`) and their reduction
//! - Replies describing each transition attempt
//! - Guard predicates and lifting combinators
//!
//! Nothing in this module performs side effects; scheduling lives in
//! [`crate::effects`] and [`crate::runtime`].

mod guard;
pub mod lift;
mod mapping;
mod reply;

pub use guard::Guard;
pub use lift::{lift_input, lift_state};
pub use mapping::{EffectMapping, Mapping, Reduce};
pub use reply::Reply;
