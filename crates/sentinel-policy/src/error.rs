use thiserror::Error;

pub type PolicyResult<T> = Result<T, PolicyError>;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("rule parse error: {0}")]
    RuleParse(String),

    #[error("rule evaluation timed out")]
    EvaluationTimeout,

    #[error("policy not found: {0}")]
    NotFound(String),

    #[error("invalid lifecycle transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: sentinel_types::PolicyState,
        to: sentinel_types::PolicyState,
    },

    #[error("transition requires a completed multi-signature upgrade record")]
    UpgradeRequired,

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("audit error: {0}")]
    Audit(#[from] sentinel_audit::AuditError),
}
