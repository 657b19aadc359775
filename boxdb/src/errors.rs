use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for boxdb operations.
///
/// Each kind names one failure category of the host/engine protocol so callers
/// can branch on it without parsing messages.
///
/// # Examples
///
/// ```rust
/// use boxdb::errors::{BoxDbError, BoxDbResult, ErrorKind};
///
/// fn lookup() -> BoxDbResult<()> {
///     Err(BoxDbError::new("no record at location", ErrorKind::DeleteTargetNotFound))
/// }
///
/// assert_eq!(lookup().unwrap_err().kind(), &ErrorKind::DeleteTargetNotFound);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// A required option is missing or options conflict
    ConfigurationError,
    /// The storage backend lacks the named capability (`len`, `truncate`, `del`)
    StorageCapabilityMissing(String),
    /// The engine artifact failed to compile or link
    InstantiationError,
    /// A delete operation did not resolve to a live record
    DeleteTargetNotFound,
    /// Wrong dimensionality or inconsistent coordinate shape
    MalformedInput,
    /// Failure reported by a storage backend
    IOError,
    /// Persisted bytes could not be encoded or decoded
    EncodingError,
    /// The operation is not valid in the current state
    InvalidOperation,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ConfigurationError => write!(f, "Configuration error"),
            ErrorKind::StorageCapabilityMissing(op) => {
                write!(f, "Storage capability missing: {}", op)
            }
            ErrorKind::InstantiationError => write!(f, "Instantiation error"),
            ErrorKind::DeleteTargetNotFound => write!(f, "Delete target not found"),
            ErrorKind::MalformedInput => write!(f, "Malformed input"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom boxdb error type.
///
/// `BoxDbError` carries a message, an [`ErrorKind`], an optional cause and a
/// backtrace captured at construction.
///
/// # Examples
///
/// ```rust
/// use boxdb::errors::{BoxDbError, ErrorKind};
///
/// let cause = BoxDbError::new("disk full", ErrorKind::IOError);
/// let err = BoxDbError::new_with_cause("batch failed", ErrorKind::IOError, cause);
/// assert!(err.cause().is_some());
/// ```
#[derive(Clone)]
pub struct BoxDbError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<BoxDbError>>,
    backtrace: Arc<Backtrace>,
}

impl BoxDbError {
    /// Creates a new `BoxDbError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        BoxDbError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `BoxDbError` that keeps `cause` in its chain.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: BoxDbError) -> Self {
        BoxDbError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Shorthand for a `StorageCapabilityMissing` error naming `op`.
    pub fn capability_missing(op: &str) -> Self {
        BoxDbError::new(
            &format!("{}() implementation not provided", op),
            ErrorKind::StorageCapabilityMissing(op.to_string()),
        )
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&BoxDbError> {
        self.cause.as_deref()
    }
}

impl Display for BoxDbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for BoxDbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} ({})\nCaused by: {:?}", self.message, self.error_kind, cause),
            None => write!(f, "{} ({})\n{:?}", self.message, self.error_kind, self.backtrace),
        }
    }
}

impl Error for BoxDbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for boxdb operations.
pub type BoxDbResult<T> = Result<T, BoxDbError>;

impl From<std::io::Error> for BoxDbError {
    fn from(err: std::io::Error) -> Self {
        BoxDbError::new(&format!("IO error: {}", err), ErrorKind::IOError)
    }
}

impl From<tokio::task::JoinError> for BoxDbError {
    fn from(err: tokio::task::JoinError) -> Self {
        BoxDbError::new(
            &format!("Background task failed: {}", err),
            ErrorKind::InternalError,
        )
    }
}
