use crate::error::AuditResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinel_crypto::Signer;
use sentinel_types::{Actor, AuditEvent, JsonValue};
use serde::Serialize;

/// Generic query window for paged reads, newest-first.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// A stored audit row with its position in the chain.
#[derive(Debug, Clone, Serialize)]
pub struct StoredEvent {
    pub event: AuditEvent,
    pub sequence: u64,
}

/// Fields supplied by a caller wanting to append an event; everything the
/// store derives (`event_id`, `ts`, `prev_hash`, `hash`, `signature`,
/// `signer_kid`) is filled in inside the backend's own transaction.
#[derive(Debug, Clone)]
pub struct AppendRequest {
    pub event_type: String,
    pub actor: Actor,
    pub payload: JsonValue,
    pub manifest_signature_id: Option<String>,
    pub retention_expires_at: Option<DateTime<Utc>>,
}

/// Storage interface for the append-only, hash-chained audit log.
///
/// `append_audit` owns the full per-event transaction: lock the chain
/// head, stamp `ts`, compute the hash, sign it, check for a duplicate
/// hash (idempotent no-op), insert, commit. Locking and signing must
/// both happen inside the same transaction so a signing failure rolls
/// back the row rather than leaving a half-written event.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, request: AppendRequest, signer: &Signer) -> AuditResult<StoredEvent>;

    async fn get_by_hash(&self, hash: &str) -> AuditResult<Option<StoredEvent>>;

    async fn get_by_id(&self, event_id: &str) -> AuditResult<Option<StoredEvent>>;

    async fn list(&self, window: QueryWindow) -> AuditResult<Vec<StoredEvent>>;

    /// Full chain, oldest first, for verification and archival.
    async fn list_all_ordered(&self) -> AuditResult<Vec<StoredEvent>>;
}
