use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Sku;

/// Core engine error types.
///
/// Every variant maps to one of the error kinds in the allocation/picking
/// design: planners never mutate and never retry, so they only ever return
/// `InvalidInput`, `InsufficientCapacity`, or `InsufficientStock`. The
/// executor additionally surfaces `StaleState`, `VersionConflict`,
/// `LockViolation`, and `IntegrityViolation`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("bin not found: {0}")]
    BinNotFound(String),

    #[error("history entry not found: {0}")]
    HistoryNotFound(String),

    #[error("insufficient capacity for sku {sku}: requested {requested}, available {available}")]
    InsufficientCapacity {
        sku: Sku,
        requested: u32,
        available: u32,
    },

    #[error("insufficient stock for sku {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: Sku,
        requested: u32,
        available: u32,
    },

    #[error("bin {bin_id} changed between planning and execution")]
    StaleState { bin_id: String },

    #[error("version conflict on bin {bin_id}: expected {expected}, found {found}")]
    VersionConflict {
        bin_id: String,
        expected: u64,
        found: u64,
    },

    #[error("bin {bin_id} is locked by operation {owner}")]
    LockViolation { bin_id: String, owner: String },

    #[error("lock conflict on {} bin(s)", .bins.len())]
    LockConflict { bins: Vec<String> },

    #[error("integrity violation on bin {bin_id}: {reason}")]
    IntegrityViolation { bin_id: String, reason: String },

    #[error("rollback failed for history entry {entry_id}: {reason}")]
    RollbackFailed { entry_id: String, reason: String },

    #[error("bin {bin_id} is disabled")]
    BinDisabled { bin_id: String },
}

/// Stable, machine-readable classification of an [`EngineError`], the
/// library-side counterpart of the source's HTTP status-code mapping.
/// An embedding caller (an HTTP handler, a CLI exit-code mapper, …) is
/// expected to translate this the way the source's `IntoResponse for
/// AppError` does, without this crate depending on any web framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidInput,
    NotFound,
    InsufficientCapacity,
    InsufficientStock,
    StaleState,
    VersionConflict,
    LockViolation,
    LockConflict,
    IntegrityViolation,
    RollbackFailed,
    BinDisabled,
}

/// Severity class, used by callers deciding whether to retry, surface to an
/// operator, or treat the failure as fatal to the current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Expected outcome of normal operation (e.g. a line with no stock).
    Routine,
    /// Recoverable with a retry the caller may already have performed.
    Retryable,
    /// Requires operator attention; nothing in the library can resolve it.
    Surfaced,
    /// An invariant was violated; the batch containing this must halt.
    Fatal,
}

impl EngineError {
    /// Split into (code, severity), the library counterpart of the
    /// source's `to_parts()` method on `AppError`.
    pub fn to_parts(&self) -> (ErrorCode, ErrorSeverity) {
        match self {
            EngineError::InvalidInput(_) => (ErrorCode::InvalidInput, ErrorSeverity::Routine),
            EngineError::BinNotFound(_) | EngineError::HistoryNotFound(_) => {
                (ErrorCode::NotFound, ErrorSeverity::Surfaced)
            }
            EngineError::InsufficientCapacity { .. } => {
                (ErrorCode::InsufficientCapacity, ErrorSeverity::Routine)
            }
            EngineError::InsufficientStock { .. } => {
                (ErrorCode::InsufficientStock, ErrorSeverity::Routine)
            }
            EngineError::StaleState { .. } => (ErrorCode::StaleState, ErrorSeverity::Retryable),
            EngineError::VersionConflict { .. } => {
                (ErrorCode::VersionConflict, ErrorSeverity::Retryable)
            }
            EngineError::LockViolation { .. } => {
                (ErrorCode::LockViolation, ErrorSeverity::Surfaced)
            }
            EngineError::LockConflict { .. } => {
                (ErrorCode::LockConflict, ErrorSeverity::Surfaced)
            }
            EngineError::IntegrityViolation { .. } => {
                (ErrorCode::IntegrityViolation, ErrorSeverity::Fatal)
            }
            EngineError::RollbackFailed { .. } => {
                (ErrorCode::RollbackFailed, ErrorSeverity::Surfaced)
            }
            EngineError::BinDisabled { .. } => (ErrorCode::BinDisabled, ErrorSeverity::Surfaced),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.to_parts().0
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.to_parts().1
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.severity(), ErrorSeverity::Retryable)
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
