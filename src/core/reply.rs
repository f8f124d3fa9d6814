//! Replies describing one transition attempt.

use serde::{Deserialize, Serialize};

/// Record of one consumed input.
///
/// Exactly one reply is produced per input, in the order inputs were
/// consumed. A `Success` carries the committed state, a `Failure` means no
/// mapping accepted the input and the state was left untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply<I, S> {
    /// The input was accepted and `to` was committed.
    Success {
        /// The consumed input
        input: I,
        /// State before the transition
        from: S,
        /// State after the transition
        to: S,
    },

    /// The input was rejected; the state is still `from`.
    Failure {
        /// The consumed input
        input: I,
        /// State at the time of rejection
        from: S,
    },
}

impl<I, S> Reply<I, S> {
    pub fn input(&self) -> &I {
        match self {
            Reply::Success { input, .. } | Reply::Failure { input, .. } => input,
        }
    }

    pub fn from_state(&self) -> &S {
        match self {
            Reply::Success { from, .. } | Reply::Failure { from, .. } => from,
        }
    }

    /// Committed state, or `None` for a rejected input.
    pub fn to_state(&self) -> Option<&S> {
        match self {
            Reply::Success { to, .. } => Some(to),
            Reply::Failure { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Reply::Failure { .. })
    }

    /// Consume the reply, returning its input.
    pub fn into_input(self) -> I {
        match self {
            Reply::Success { input, .. } | Reply::Failure { input, .. } => input,
        }
    }
}
