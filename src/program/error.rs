use thiserror::Error;
use uuid::Uuid;

use crate::program::types::ProgramStatus;

/// Errors surfaced by the workflow core. All of these are synchronous
/// returns; no partial state is ever committed alongside an error.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The requested action is not legal from the program's current
    /// status. Carries the actions that would be legal so callers can
    /// render them.
    #[error("invalid transition: '{action}' is not allowed from status {status} (allowed: {allowed:?})")]
    InvalidTransition {
        status: ProgramStatus,
        action: &'static str,
        allowed: &'static [&'static str],
    },

    /// Actor role or ownership does not permit the action.
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    /// A required field is missing or out of range.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// Referenced program or report does not exist.
    #[error("program kerja {id} not found")]
    NotFound { id: Uuid },

    /// Concurrent modification detected; the caller should re-fetch
    /// the program and retry. The core never retries on its own.
    #[error("program kerja {id} was modified concurrently, re-fetch and retry")]
    Conflict { id: Uuid },

    /// Persistence layer failure.
    #[error("storage error: {reason}")]
    Storage { reason: String },
}

impl WorkflowError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        WorkflowError::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        WorkflowError::Validation {
            reason: reason.into(),
        }
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        WorkflowError::Storage {
            reason: reason.into(),
        }
    }
}
