//! Build errors for harvester and transition builders.

use thiserror::Error;

/// Errors that can occur when building harvesters and transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .state(state) before .build()")]
    MissingInitialState,

    #[error("No mapping defined. Call .mapping(mapping) before .build()")]
    MissingMapping,

    #[error("Reply capacity must be greater than zero")]
    ZeroReplyCapacity,

    #[error("Transition input not specified. Call .on(input) or .when_input(predicate)")]
    MissingInput,

    #[error("Transition source state not specified. Call .from(state), .when(predicate) or .from_any()")]
    MissingFromState,

    #[error("Transition target state not specified. Call .to(state) or .update(f)")]
    MissingToState,
}
