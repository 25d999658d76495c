use thiserror::Error;

pub type AuditResult<T> = Result<T, AuditError>;

/// Audit-layer errors.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("signing failed: {0}")]
    SigningFailure(String),

    #[error("chain integrity error: {0}")]
    ChainIntegrity(String),

    #[error("transient infrastructure error: {0}")]
    Transient(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl AuditError {
    /// Whether this failure is worth retrying with backoff (timeout,
    /// connection drop, deadlock, serialization failure).
    pub fn is_transient(&self) -> bool {
        matches!(self, AuditError::Transient(_))
    }
}

pub(crate) fn classify_sqlx_error(err: sqlx::Error) -> AuditError {
    use sqlx::Error as E;
    match &err {
        E::Io(_) | E::PoolTimedOut | E::PoolClosed => AuditError::Transient(err.to_string()),
        E::Database(db) if db.code().as_deref() == Some("40001") => {
            AuditError::Transient(err.to_string())
        }
        E::Database(db) if db.code().as_deref() == Some("40P01") => {
            AuditError::Transient(format!("deadlock detected: {err}"))
        }
        _ => AuditError::Backend(err.to_string()),
    }
}
