//! Engine error type and its mapping onto protocol error kinds.

use boxdb::errors::{BoxDbError, ErrorKind};
use thiserror::Error;

/// Errors raised inside the page tree engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] BoxDbError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupted page: {0}")]
    Corrupted(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Delete target not found: {0}")]
    DeleteTargetNotFound(String),

    #[error("Dimension mismatch: tree has {found} dimensions, engine expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

impl From<EngineError> for BoxDbError {
    fn from(err: EngineError) -> Self {
        match err {
            // storage errors already carry a protocol kind
            EngineError::Storage(inner) => inner,
            EngineError::Serialization(msg) => BoxDbError::new(&msg, ErrorKind::EncodingError),
            EngineError::Corrupted(msg) => BoxDbError::new(
                &format!("corrupted engine page: {}", msg),
                ErrorKind::IOError,
            ),
            EngineError::InvalidOperation(msg) => {
                BoxDbError::new(&msg, ErrorKind::InvalidOperation)
            }
            EngineError::DeleteTargetNotFound(msg) => {
                BoxDbError::new(&msg, ErrorKind::DeleteTargetNotFound)
            }
            mismatch @ EngineError::DimensionMismatch { .. } => {
                BoxDbError::new(&mismatch.to_string(), ErrorKind::MalformedInput)
            }
        }
    }
}

impl From<bincode::error::EncodeError> for EngineError {
    fn from(err: bincode::error::EncodeError) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for EngineError {
    fn from(err: bincode::error::DecodeError) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
