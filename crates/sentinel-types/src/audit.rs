//! The `AuditEvent` central entity.

use crate::ids::{Actor, EventId};
use crate::json::JsonValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A committed, tamper-evident audit event.
///
/// Invariants (enforced by `sentinel-audit`, not by this type):
/// `hash = H(canonicalize(event \ {hash, signature}))`; for every event
/// except the genesis, `prevHash = predecessor.hash`; `(eventType, hash)`
/// is unique; the signature verifies against the public key registered
/// for `signerKid` at `ts`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: EventId,
    pub event_type: String,
    pub actor: Actor,
    pub ts: DateTime<Utc>,
    pub payload: JsonValue,
    pub prev_hash: Option<String>,
    pub hash: String,
    pub signature: String,
    pub signer_kid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_signature_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_expires_at: Option<DateTime<Utc>>,
}

/// Fields of an `AuditEvent` that exist before signing/hashing happen.
/// This is what `appendAuditEvent` callers provide; `sentinel-audit` fills
/// in `event_id`, `ts`, `prev_hash`, `hash`, `signature`, `signer_kid`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEventDraft {
    pub event_type: String,
    pub actor: Actor,
    pub payload: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_signature_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// The subset of `AuditEvent` that is fed to the canonicalizer/hasher:
/// every field except `signature` and `hash` themselves.
#[derive(Clone, Debug, Serialize)]
pub struct HashableAuditEvent<'a> {
    pub event_id: &'a EventId,
    pub event_type: &'a str,
    pub actor: &'a Actor,
    pub ts: DateTime<Utc>,
    pub payload: &'a JsonValue,
    pub prev_hash: &'a Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_signature_id: &'a Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_expires_at: &'a Option<DateTime<Utc>>,
}

impl AuditEvent {
    pub fn hashable(&self) -> HashableAuditEvent<'_> {
        HashableAuditEvent {
            event_id: &self.event_id,
            event_type: &self.event_type,
            actor: &self.actor,
            ts: self.ts,
            payload: &self.payload,
            prev_hash: &self.prev_hash,
            manifest_signature_id: &self.manifest_signature_id,
            retention_expires_at: &self.retention_expires_at,
        }
    }
}

/// A correction event type. Corrections never mutate a prior event; they
/// reference it by id instead.
pub const RECONCILIATION_EVENT_TYPE: &str = "audit.reconciliation";

pub fn reconciliation_payload(original_event_id: &EventId, reason: &str) -> JsonValue {
    JsonValue::from_serde_json(serde_json::json!({
        "originalEventId": original_event_id.0,
        "reason": reason,
    }))
}
