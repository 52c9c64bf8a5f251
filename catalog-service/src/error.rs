//! Error types and caller-facing error shaping

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Message shown to callers whenever the concrete cause must stay internal
pub const UNEXPECTED_ERROR_MESSAGE: &str = "Unexpected error occurred, please try again later.";

// ============================================================================
// Structured Storage Errors
// ============================================================================

/// Storage operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOperation {
    /// Establishing a connection
    Connect,
    /// Running a read query
    Query,
    /// Inserting a row
    Insert,
    /// Running a row-count aggregate
    Count,
    /// Acquiring a connection from the pool
    PoolAcquire,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Query => write!(f, "query"),
            Self::Insert => write!(f, "insert"),
            Self::Count => write!(f, "count"),
            Self::PoolAcquire => write!(f, "pool_acquire"),
        }
    }
}

/// Category of storage error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    /// Failed to establish connection
    ConnectionFailed,
    /// Query execution failed
    QueryFailed,
    /// Constraint violation (unique, foreign key, check)
    ConstraintViolation,
    /// Operation timed out
    Timeout,
    /// Connection pool exhausted
    PoolExhausted,
    /// A row could not be decoded into its model
    Decode,
    /// Other/unknown error
    Other,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::QueryFailed => write!(f, "query_failed"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::Timeout => write!(f, "timeout"),
            Self::PoolExhausted => write!(f, "pool_exhausted"),
            Self::Decode => write!(f, "decode"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured storage error with operation context
///
/// The message and context are meant for operators. Callers only ever see
/// [`UNEXPECTED_ERROR_MESSAGE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    /// The operation being performed when the error occurred
    pub operation: StorageOperation,
    /// The category of error
    pub kind: StorageErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Additional context (e.g., table name, constraint name)
    pub context: Option<String>,
    unique_violation: bool,
}

impl StorageError {
    /// Create a new storage error
    pub fn new(
        operation: StorageOperation,
        kind: StorageErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            context: None,
            unique_violation: false,
        }
    }

    /// Create a query failed error
    pub fn query_failed(operation: StorageOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StorageErrorKind::QueryFailed, message)
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(
            StorageOperation::Connect,
            StorageErrorKind::ConnectionFailed,
            message,
        )
    }

    /// Create a unique-constraint violation error
    pub fn unique_violation(operation: StorageOperation, message: impl Into<String>) -> Self {
        let mut error = Self::new(operation, StorageErrorKind::ConstraintViolation, message);
        error.unique_violation = true;
        error
    }

    /// Add context to an existing error
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Replace the operation the error is attributed to
    pub fn during(mut self, operation: StorageOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether the failure was caused by a duplicate unique key
    pub fn is_unique_violation(&self) -> bool {
        self.unique_violation
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            StorageErrorKind::ConnectionFailed
                | StorageErrorKind::Timeout
                | StorageErrorKind::PoolExhausted
        )
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Storage {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref ctx) = self.context {
            write!(f, " [context: {}]", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {}

#[cfg(feature = "database")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;

        match &err {
            E::Database(db_err) if db_err.is_unique_violation() => {
                let error =
                    StorageError::unique_violation(StorageOperation::Insert, db_err.message());
                match db_err.constraint() {
                    Some(constraint) => error.add_context(constraint.to_string()),
                    None => error,
                }
            }
            E::Database(db_err) => StorageError::new(
                StorageOperation::Query,
                if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                    StorageErrorKind::ConstraintViolation
                } else {
                    StorageErrorKind::QueryFailed
                },
                db_err.message(),
            ),
            E::PoolTimedOut => StorageError::new(
                StorageOperation::PoolAcquire,
                StorageErrorKind::PoolExhausted,
                "connection pool timed out",
            ),
            E::PoolClosed => StorageError::new(
                StorageOperation::PoolAcquire,
                StorageErrorKind::ConnectionFailed,
                "connection pool closed",
            ),
            E::Io(_) | E::Tls(_) => StorageError::connection_failed(err.to_string()),
            E::ColumnDecode { .. } | E::Decode(_) | E::ColumnNotFound(_) => StorageError::new(
                StorageOperation::Query,
                StorageErrorKind::Decode,
                err.to_string(),
            ),
            _ => StorageError::new(
                StorageOperation::Query,
                StorageErrorKind::Other,
                err.to_string(),
            ),
        }
    }
}

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for catalog operations
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or out-of-range input
    #[error("Validation error: {0}")]
    Validation(String),

    /// The entity being created already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No entity matches the requested key
    #[error("Not found: {0}")]
    NotFound(String),

    /// Structured storage error with operation context
    #[error("{0}")]
    Storage(StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),
}

impl Error {
    /// Status code the transport layer should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Storage(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::Storage(_) => "STORAGE_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Message that is safe to show to the caller
    pub fn public_message(&self) -> String {
        match self {
            Error::Validation(msg) | Error::NotFound(msg) | Error::Conflict(msg) => msg.clone(),
            Error::Storage(_) | Error::Config(_) => UNEXPECTED_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Optional error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// HTTP status code
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            status: status.as_u16(),
        }
    }

    /// Create error response with a code
    pub fn with_code(
        status: StatusCode,
        code: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
            status: status.as_u16(),
        }
    }
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        if matches!(err, Error::Storage(_) | Error::Config(_)) {
            tracing::error!(error = %err, "Request failed with an internal error");
        }
        ErrorResponse::with_code(err.status_code(), err.code(), err.public_message())
    }
}
