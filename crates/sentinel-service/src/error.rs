//! Maps every governance-crate error into an HTTP response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Kernel(#[from] sentinel_kernel::KernelError),

    #[error(transparent)]
    Policy(#[from] sentinel_policy::PolicyError),

    #[error(transparent)]
    Audit(#[from] sentinel_audit::AuditError),

    #[error(transparent)]
    Memory(#[from] sentinel_memory::MemoryError),

    #[error(transparent)]
    Workflow(#[from] sentinel_workflow::WorkflowError),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Kernel(sentinel_kernel::KernelError::PolicyDenied { .. }) => {
                (StatusCode::FORBIDDEN, "policy_denied")
            }
            ApiError::Kernel(sentinel_kernel::KernelError::IdempotencyKeyConflict(_)) => {
                (StatusCode::CONFLICT, "idempotency_key_conflict")
            }
            ApiError::Kernel(_) => (StatusCode::INTERNAL_SERVER_ERROR, "kernel_error"),

            ApiError::Policy(sentinel_policy::PolicyError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "policy_not_found")
            }
            ApiError::Policy(sentinel_policy::PolicyError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, "invalid_transition")
            }
            ApiError::Policy(sentinel_policy::PolicyError::UpgradeRequired) => {
                (StatusCode::FORBIDDEN, "upgrade_required")
            }
            ApiError::Policy(_) => (StatusCode::BAD_REQUEST, "policy_error"),

            ApiError::Audit(sentinel_audit::AuditError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "audit_record_not_found")
            }
            ApiError::Audit(_) => (StatusCode::INTERNAL_SERVER_ERROR, "audit_error"),

            ApiError::Memory(sentinel_memory::MemoryError::NodeNotFound(_)) => {
                (StatusCode::NOT_FOUND, "memory_node_not_found")
            }
            ApiError::Memory(sentinel_memory::MemoryError::VectorNotFound(_)) => {
                (StatusCode::NOT_FOUND, "memory_vector_not_found")
            }
            ApiError::Memory(sentinel_memory::MemoryError::ChecksumMismatch { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "checksum_mismatch")
            }
            ApiError::Memory(sentinel_memory::MemoryError::LegalHold) => {
                (StatusCode::FORBIDDEN, "legal_hold")
            }
            ApiError::Memory(sentinel_memory::MemoryError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_input")
            }
            ApiError::Memory(_) => (StatusCode::INTERNAL_SERVER_ERROR, "memory_error"),

            ApiError::Workflow(sentinel_workflow::WorkflowError::AllocationNotFound(_)) => {
                (StatusCode::NOT_FOUND, "allocation_not_found")
            }
            ApiError::Workflow(sentinel_workflow::WorkflowError::AlreadyTerminal { .. }) => {
                (StatusCode::CONFLICT, "allocation_terminal")
            }
            ApiError::Workflow(sentinel_workflow::WorkflowError::SettlementUnbalanced) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "settlement_unbalanced")
            }
            ApiError::Workflow(sentinel_workflow::WorkflowError::SettlementSignatureInvalid) => {
                (StatusCode::UNAUTHORIZED, "settlement_signature_invalid")
            }
            ApiError::Workflow(_) => (StatusCode::INTERNAL_SERVER_ERROR, "workflow_error"),

            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        }

        (status, Json(json!({ "error": code, "message": self.to_string() }))).into_response()
    }
}
