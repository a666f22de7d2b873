//! Error types and their classification.

use thiserror::Error;

/// Failure of the persistence layer.
///
/// `NotFound` is kept apart from storage failures so a lookup miss is never
/// confused with a broken database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    /// A foreign key or uniqueness rule refused the write.
    #[error("rejected by constraint: {0}")]
    Constraint(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("stored row is not readable: {0}")]
    Corrupt(String),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Like `From<rusqlite::Error>`, but constraint violations become
    /// [`StoreError::Constraint`].
    pub fn classify(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::SqliteFailure(e, message)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(message.unwrap_or_else(|| e.to_string()))
            }
            other => Self::Database(other),
        }
    }
}

/// ErrorKind classifies a failed delivery attempt.
///
/// - Timeout / Connect: the partner was not reached, retry next cycle
/// - Other: request could not be built or sent for another reason
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    Connect,
    Other,
}

/// Transport-level failure of an outbound call. An HTTP answer, whatever
/// its status, is never a `DeliveryError`.
#[derive(Debug, Error)]
#[error("delivery failed ({kind:?}): {message}")]
pub struct DeliveryError {
    kind: ErrorKind,
    message: String,
}

impl DeliveryError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            ErrorKind::Timeout
        } else if error.is_connect() {
            ErrorKind::Connect
        } else {
            ErrorKind::Other
        };
        Self::new(kind, error.to_string())
    }
}
