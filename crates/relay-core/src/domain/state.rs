//! Lifecycle state of tasks and processing steps, and the reply taxonomy
//! returned by pipeline operations.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State shared by `Task` and `ProcessingStep`.
///
/// State transitions:
/// - Task: New -> Published (by spread, together with the fan-out)
/// - Step: New -> InProgress -> Processed | Error
/// - Step: InProgress -> InProgress (transport failure, stays retryable)
///
/// The numeric codes are what the `STATE` columns hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    New,
    InProgress,
    Published,
    Processed,
    Error,
}

impl State {
    pub fn code(self) -> i64 {
        match self {
            State::New => 1,
            State::InProgress => 2,
            State::Published => 3,
            State::Processed => 4,
            State::Error => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(State::New),
            2 => Some(State::InProgress),
            3 => Some(State::Published),
            4 => Some(State::Processed),
            5 => Some(State::Error),
            _ => None,
        }
    }

    /// Nothing left to do for this row; a resend of it is harmless.
    pub fn is_finished(self) -> bool {
        matches!(self, State::Published | State::Processed)
    }

    /// A step in this state is picked up by the next scheduler cycle.
    pub fn is_pending_delivery(self) -> bool {
        matches!(self, State::New | State::InProgress)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::New => "new",
            State::InProgress => "in progress",
            State::Published => "published",
            State::Processed => "processed",
            State::Error => "error",
        };
        f.write_str(s)
    }
}

impl ToSql for State {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for State {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = i64::column_result(value)?;
        State::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

/// Outcome of a pipeline operation as seen by the caller.
///
/// Failures are recoverable by the caller: the partner inspects the reason
/// and decides whether to resend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reply {
    /// Partner rejected a delivery, or the partner could not be reached.
    BadRequest,
    BadRequestJsonDecode,
    BadRequestMandatoryKey,
    BadRequestNotStoreAble,
    BadRequestDBError,
    RequestReceived,
    RequestStored,
    ConflictRequest,
}

impl Reply {
    /// HTTP status put on the wire.
    ///
    /// A duplicate conflict is answered with 400 like every other rejection.
    pub fn status(self) -> u16 {
        match self {
            Reply::RequestReceived => 200,
            Reply::RequestStored => 201,
            Reply::BadRequest
            | Reply::BadRequestJsonDecode
            | Reply::BadRequestMandatoryKey
            | Reply::BadRequestNotStoreAble
            | Reply::BadRequestDBError
            | Reply::ConflictRequest => 400,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Reply::BadRequest => "request body unsupported",
            Reply::BadRequestJsonDecode => "body could not be decoded as json",
            Reply::BadRequestMandatoryKey => "mandatory key(s) are missing in the body",
            Reply::BadRequestNotStoreAble => "data are not store able",
            Reply::BadRequestDBError => "data base error",
            Reply::RequestReceived => "received",
            Reply::RequestStored => "stored",
            Reply::ConflictRequest => "already stored",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Reply::RequestReceived | Reply::RequestStored)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reason(), self.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_match_the_stored_values() {
        for (state, code) in [
            (State::New, 1),
            (State::InProgress, 2),
            (State::Published, 3),
            (State::Processed, 4),
            (State::Error, 5),
        ] {
            assert_eq!(state.code(), code);
            assert_eq!(State::from_code(code), Some(state));
        }
        assert_eq!(State::from_code(0), None);
        assert_eq!(State::from_code(6), None);
    }

    #[test]
    fn pending_delivery_covers_new_and_in_progress() {
        assert!(State::New.is_pending_delivery());
        assert!(State::InProgress.is_pending_delivery());
        assert!(!State::Processed.is_pending_delivery());
        assert!(!State::Error.is_pending_delivery());
    }

    #[test]
    fn every_rejection_is_a_400() {
        assert_eq!(Reply::ConflictRequest.status(), 400);
        assert_eq!(Reply::BadRequestDBError.status(), 400);
        assert_eq!(Reply::RequestStored.status(), 201);
        assert!(!Reply::ConflictRequest.is_success());
        assert!(Reply::RequestReceived.is_success());
    }
}
