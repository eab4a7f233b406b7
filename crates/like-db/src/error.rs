use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the datastore layer. Uniqueness violations are
/// classified at the write boundary so callers can report which field
/// collided instead of leaking raw SQLite messages.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already in use")]
    DuplicateUsername,
    #[error("email already in use")]
    DuplicateEmail,
    #[error("a post for today already exists for this user")]
    DuplicatePost,
    #[error("database lock poisoned")]
    LockPoisoned,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Map a SQLite error from a write into the duplicate kind whose
    /// constraint fired, falling back to the raw error.
    pub(crate) fn classify_constraint(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(e, Some(msg)) = &err {
            if e.code == rusqlite::ErrorCode::ConstraintViolation {
                if msg.contains("users.email") {
                    return Self::DuplicateEmail;
                }
                if msg.contains("users.username") {
                    return Self::DuplicateUsername;
                }
                if msg.contains("posts") {
                    return Self::DuplicatePost;
                }
            }
        }
        Self::Sqlite(err)
    }
}
