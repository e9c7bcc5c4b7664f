//! Sweeper error types

use mailroom_common::error::{ErrorClassification, ErrorSeverity};
use mailroom_domain::MailroomError;
use thiserror::Error;

/// Outcome of a sweep that did not run to completion
#[derive(Debug, Error)]
pub enum CleanupError {
    /// Cancellation was observed between batches
    #[error("Cleanup stopped")]
    Stopped,

    #[error(transparent)]
    Storage(#[from] MailroomError),
}

impl CleanupError {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl ErrorClassification for CleanupError {
    /// Storage failures are retried on the next cycle; a stop never is.
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(MailroomError::Database(_)))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Stopped => ErrorSeverity::Info,
            Self::Storage(MailroomError::Database(_)) => ErrorSeverity::Warning,
            Self::Storage(_) => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<std::time::Duration> {
        None
    }
}
