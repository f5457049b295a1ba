use thiserror::Error;

use crate::db::models::SetRating;

pub type Result<T, E = SessionError> = std::result::Result<T, E>;

/// Outcome kinds of session and aggregation operations.
///
/// `SetLimitReached`, `NoActiveSet` and `AlreadyCompleted` are expected
/// states of a workout rather than failures; see [`SessionError::is_navigation`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Absent, or owned by another user. The two are never told apart.
    #[error("not found")]
    NotFound,
    #[error("a set is already in progress for this workout")]
    SetAlreadyActive,
    #[error("set limit reached for this exercise")]
    SetLimitReached,
    #[error("no set is in progress for this workout")]
    NoActiveSet,
    #[error("workout is already completed")]
    AlreadyCompleted,
    #[error("a set can only be rated good or bad, got {0}")]
    InvalidRating(SetRating),
    #[error("invalid exercise: {0}")]
    InvalidExercise(String),
    /// Connection loss, pool exhaustion or a locked database; retry the request.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),
    #[error("store error: {0}")]
    Store(#[source] sqlx::Error),
}

impl SessionError {
    /// Outcomes that should drive navigation ("pick next exercise",
    /// "workout complete") instead of being shown as errors.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            SessionError::SetLimitReached | SessionError::NoActiveSet | SessionError::AlreadyCompleted
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::StoreUnavailable(_))
    }
}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return SessionError::NotFound;
        }
        if is_transient(&err) {
            SessionError::StoreUnavailable(err)
        } else {
            SessionError::Store(err)
        }
    }
}

// SQLITE_BUSY and SQLITE_LOCKED, including their extended codes.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
        _ => false,
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
