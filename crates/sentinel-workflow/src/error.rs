use sentinel_types::AllocationId;
use thiserror::Error;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("allocation not found: {0}")]
    AllocationNotFound(AllocationId),

    #[error("allocation {id} is in terminal state and cannot transition")]
    AlreadyTerminal { id: AllocationId },

    #[error("settlement ledger lines do not balance")]
    SettlementUnbalanced,

    #[error("settlement signature is invalid or signer unregistered")]
    SettlementSignatureInvalid,

    #[error("policy engine error: {0}")]
    Policy(#[from] sentinel_policy::PolicyError),

    #[error("audit error: {0}")]
    Audit(#[from] sentinel_audit::AuditError),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}
