use thiserror::Error;

pub type KernelResult<T> = Result<T, KernelError>;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("policy denied the write: {rationale}")]
    PolicyDenied { rationale: String },

    #[error("idempotency key conflict: a different request already used key {0}")]
    IdempotencyKeyConflict(String),

    #[error("domain write failed: {0}")]
    DomainWrite(String),

    #[error("policy engine error: {0}")]
    Policy(#[from] sentinel_policy::PolicyError),

    #[error("audit error: {0}")]
    Audit(#[from] sentinel_audit::AuditError),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}
