use sentinel_types::{MemoryNodeId, MemoryVectorId};
use thiserror::Error;

pub type MemoryResult<T> = Result<T, MemoryError>;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory node not found: {0}")]
    NodeNotFound(MemoryNodeId),

    #[error("memory vector not found: {0}")]
    VectorNotFound(MemoryVectorId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("artifact checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("a vector is already queued for this node in namespace {0}")]
    DuplicateVector(String),

    #[error("node is under legal hold")]
    LegalHold,

    #[error("audit error: {0}")]
    Audit(#[from] sentinel_audit::AuditError),

    #[error("kernel error: {0}")]
    Kernel(#[from] sentinel_kernel::KernelError),

    #[error("backend error: {0}")]
    Backend(String),
}
