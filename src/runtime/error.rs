//! Runtime errors.

use thiserror::Error;

/// Errors returned by a running harvester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HarvesterError {
    /// The harvester has shut down and no longer accepts inputs.
    #[error("Harvester is closed and no longer accepts inputs")]
    Closed,
}
