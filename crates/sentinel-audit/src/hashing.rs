use crate::error::AuditResult;
use chrono::{DateTime, Utc};
use sentinel_types::{Actor, AuditEvent, HashableAuditEvent, JsonValue};

/// Compute the SHA-256 digest of an event's canonical form, given the
/// chain position it would occupy. Shared by every backend so the hash
/// is computed identically regardless of which store produces it.
pub fn compute_hash(
    event_id: &str,
    event_type: &str,
    actor: &Actor,
    ts: DateTime<Utc>,
    payload: &JsonValue,
    prev_hash: &Option<String>,
    manifest_signature_id: &Option<String>,
    retention_expires_at: &Option<DateTime<Utc>>,
) -> AuditResult<[u8; 32]> {
    let event_id_typed = sentinel_types::EventId(event_id.to_string());
    let hashable = HashableAuditEvent {
        event_id: &event_id_typed,
        event_type,
        actor,
        ts,
        payload,
        prev_hash,
        manifest_signature_id,
        retention_expires_at,
    };
    sentinel_canon::digest_serde(&hashable).map_err(|e| crate::error::AuditError::Backend(e.to_string()))
}

/// Build the finished, signed `AuditEvent` from its parts.
#[allow(clippy::too_many_arguments)]
pub fn finish_event(
    event_id: String,
    event_type: String,
    actor: Actor,
    ts: DateTime<Utc>,
    payload: JsonValue,
    prev_hash: Option<String>,
    hash: String,
    signature: String,
    signer_kid: String,
    manifest_signature_id: Option<String>,
    retention_expires_at: Option<DateTime<Utc>>,
) -> AuditEvent {
    AuditEvent {
        event_id: sentinel_types::EventId(event_id),
        event_type,
        actor,
        ts,
        payload,
        prev_hash,
        hash,
        signature,
        signer_kid,
        manifest_signature_id,
        retention_expires_at,
    }
}
