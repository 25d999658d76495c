//! Standalone chain integrity verification, independent of the write
//! path: walk a store's full chain and report the first `hash` /
//! `prevHash` / signature mismatch, if any.

use crate::error::AuditResult;
use crate::hashing::compute_hash;
use crate::store::AuditStore;
use sentinel_crypto::KeyRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainViolation {
    /// The recomputed hash doesn't match the stored `hash`.
    HashMismatch { event_id: String },
    /// `prevHash` doesn't equal the predecessor's `hash`.
    PrevHashMismatch { event_id: String },
    /// The signature does not verify against the registered key for
    /// `signerKid` at the event's timestamp.
    SignatureInvalid { event_id: String },
    /// No key is registered for `signerKid` at all.
    UnknownSigner { event_id: String, signer_kid: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub events_checked: usize,
    pub violation: Option<ChainViolation>,
}

impl VerificationReport {
    pub fn is_intact(&self) -> bool {
        self.violation.is_none()
    }
}

/// Walk the full chain oldest-first, recomputing each hash and checking
/// linkage and signature. Stops at the first violation; a clean chain
/// reports `violation: None` and the number of events checked.
pub async fn verify_chain(
    store: &dyn AuditStore,
    registry: &dyn KeyRegistry,
    signer: &sentinel_crypto::Signer,
) -> AuditResult<VerificationReport> {
    let events = store.list_all_ordered().await?;
    let mut expected_prev: Option<String> = None;

    for (checked, stored) in events.iter().enumerate() {
        let event = &stored.event;

        if event.prev_hash != expected_prev {
            return Ok(VerificationReport {
                events_checked: checked + 1,
                violation: Some(ChainViolation::PrevHashMismatch {
                    event_id: event.event_id.to_string(),
                }),
            });
        }

        let recomputed = compute_hash(
            event.event_id.as_str(),
            &event.event_type,
            &event.actor,
            event.ts,
            &event.payload,
            &event.prev_hash,
            &event.manifest_signature_id,
            &event.retention_expires_at,
        )?;
        let recomputed_hex = hex::encode(recomputed);

        if recomputed_hex != event.hash {
            return Ok(VerificationReport {
                events_checked: checked + 1,
                violation: Some(ChainViolation::HashMismatch {
                    event_id: event.event_id.to_string(),
                }),
            });
        }

        if registry.lookup(&event.signer_kid, event.ts).is_none() {
            return Ok(VerificationReport {
                events_checked: checked + 1,
                violation: Some(ChainViolation::UnknownSigner {
                    event_id: event.event_id.to_string(),
                    signer_kid: event.signer_kid.clone(),
                }),
            });
        }

        if !signer.verify(&recomputed, &event.signature, &event.signer_kid, Some(registry), event.ts) {
            return Ok(VerificationReport {
                events_checked: checked + 1,
                violation: Some(ChainViolation::SignatureInvalid {
                    event_id: event.event_id.to_string(),
                }),
            });
        }

        expected_prev = Some(event.hash.clone());
    }

    Ok(VerificationReport {
        events_checked: events.len(),
        violation: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryAuditStore;
    use crate::store::AppendRequest;
    use sentinel_crypto::{InMemoryKeyRegistry, LocalEphemeralSigner, Signer};
    use sentinel_types::{Actor, JsonValue};
    use std::sync::Arc;
    use std::time::Duration;

    fn request(event_type: &str) -> AppendRequest {
        AppendRequest {
            event_type: event_type.to_string(),
            actor: Actor::new("tester"),
            payload: JsonValue::Null,
            manifest_signature_id: None,
            retention_expires_at: None,
        }
    }

    #[tokio::test]
    async fn clean_chain_verifies() {
        let local = LocalEphemeralSigner::generate("kid-1");
        let registry = InMemoryKeyRegistry::new();
        registry.register("kid-1", local.verifying_key(), chrono::Utc::now() - chrono::Duration::seconds(1), None);
        let signer = Signer::new(Arc::new(local), Duration::from_secs(1));

        let store = InMemoryAuditStore::new();
        store.append_audit(request("a"), &signer).await.unwrap();
        store.append_audit(request("b"), &signer).await.unwrap();

        let report = verify_chain(&store, &registry, &signer).await.unwrap();
        assert!(report.is_intact());
        assert_eq!(report.events_checked, 2);
    }

    #[tokio::test]
    async fn unregistered_signer_is_flagged() {
        let local = LocalEphemeralSigner::generate("kid-1");
        let empty_registry = InMemoryKeyRegistry::new();
        let signer = Signer::new(Arc::new(local), Duration::from_secs(1));

        let store = InMemoryAuditStore::new();
        store.append_audit(request("a"), &signer).await.unwrap();

        let report = verify_chain(&store, &empty_registry, &signer).await.unwrap();
        assert!(!report.is_intact());
        assert!(matches!(report.violation, Some(ChainViolation::UnknownSigner { .. })));
    }
}
