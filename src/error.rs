use thiserror::Error;

use crate::trace::OperationRecord;

pub type Result<T, E = MagicStreamError> = std::result::Result<T, E>;

/// Errors raised by the operation log codec, the session lifecycle and
/// intercepted file operations.
#[derive(Debug, Error)]
pub enum MagicStreamError {
    #[error("corrupt operation log at byte {offset}: {detail}")]
    CorruptLog { offset: u64, detail: String },

    #[error("operation log write failed after {written} records reached the stream: {source}")]
    LogWrite {
        /// Records the backing stream accepted before the failure.
        written: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read the operation log at byte {offset}: {source}")]
    LogRead {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("operation log exhausted after {consumed} records")]
    LogExhausted {
        consumed: u64,
        /// The live operation that found the log empty, when known.
        attempted: Option<OperationRecord>,
    },

    #[error("replay diverged at record #{index}: expected {expected:?}, got {actual:?}")]
    Divergence {
        index: u64,
        expected: OperationRecord,
        actual: OperationRecord,
    },

    #[error("a magic stream session is already active ({mode})")]
    SessionAlreadyActive { mode: &'static str },

    #[error("no magic stream session is active")]
    NoActiveSession,

    #[error("replay closed with {remaining} unconsumed records (consumed {consumed})")]
    LogNotFullyConsumed { consumed: u64, remaining: u64 },

    #[error("magic stream session already failed: {reason}")]
    SessionFailed { reason: String },

    #[error("magic stream session is closed and cannot be reopened")]
    SessionClosed,

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl MagicStreamError {
    #[must_use]
    pub fn io(operation: &'static str, source: std::io::Error) -> Self {
        Self::Io { operation, source }
    }

    #[must_use]
    pub fn corrupt(offset: u64, detail: impl Into<String>) -> Self {
        Self::CorruptLog {
            offset,
            detail: detail.into(),
        }
    }

    /// Whether this error ends the session it was raised in. Failures of
    /// the real file operation (`Io`) never do.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(
            self,
            Self::CorruptLog { .. }
                | Self::LogWrite { .. }
                | Self::LogRead { .. }
                | Self::LogExhausted { .. }
                | Self::Divergence { .. }
        )
    }
}
