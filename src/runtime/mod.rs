//! The harvester runtime.
//!
//! A [`Harvester`] is a handle to a spawned tokio task that owns the state.
//! The task merges the external input stream, inputs sent through the
//! handle, and inputs produced by effects, and processes them strictly one
//! at a time.

mod config;
pub(crate) mod driver;
mod error;
mod harvester;

pub use config::{HarvesterConfig, DEFAULT_REPLY_CAPACITY};
pub use error::HarvesterError;
pub use harvester::Harvester;
