//! The gated-write coordinator: policy check, domain write, and audit
//! append as a single envelope, de-duplicated by idempotency key.

use crate::error::{KernelError, KernelResult};
use crate::idempotency::{IdempotencyRecord, IdempotencyStore};
use chrono::{Duration as ChronoDuration, Utc};
use sentinel_audit::{AppendRequest, AuditEngine};
use sentinel_policy::PolicyEngine;
use sentinel_types::{Actor, JsonValue, PolicyCheckRequest, PolicyDecision, RequestId};
use std::future::Future;
use std::sync::Arc;

const DEFAULT_TTL: ChronoDuration = ChronoDuration::hours(24);

#[derive(Clone, Debug)]
pub struct GatedWriteRequest {
    pub idempotency_key: String,
    pub action: String,
    pub actor: String,
    pub resource: JsonValue,
    pub context: JsonValue,
    pub request_id: Option<RequestId>,
}

#[derive(Debug)]
pub enum GatedWriteOutcome {
    Applied {
        result: JsonValue,
        decision: PolicyDecision,
    },
    Denied {
        decision: PolicyDecision,
    },
    Replayed {
        result: JsonValue,
    },
}

pub struct GatedWriteCoordinator {
    policy: Arc<PolicyEngine>,
    audit: Arc<AuditEngine>,
    idempotency: Arc<dyn IdempotencyStore>,
    ttl: ChronoDuration,
}

impl GatedWriteCoordinator {
    pub fn new(
        policy: Arc<PolicyEngine>,
        audit: Arc<AuditEngine>,
        idempotency: Arc<dyn IdempotencyStore>,
    ) -> Self {
        Self {
            policy,
            audit,
            idempotency,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: ChronoDuration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Runs `domain_write` only after the policy engine allows
    /// `request.action`, and only once per idempotency key. The audit
    /// append happens after the domain write succeeds; if it fails the
    /// whole envelope returns an error and no idempotency record is
    /// stored, so a retry with the same key re-attempts the write.
    pub async fn execute<F, Fut>(
        &self,
        request: GatedWriteRequest,
        domain_write: F,
    ) -> KernelResult<GatedWriteOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = KernelResult<JsonValue>>,
    {
        let request_hash = normalized_hash(&request)?;

        if let Some(existing) = self.idempotency.get(&request.idempotency_key).await? {
            if existing.request_hash == request_hash {
                return Ok(GatedWriteOutcome::Replayed {
                    result: existing.result,
                });
            }
            return Err(KernelError::IdempotencyKeyConflict(request.idempotency_key));
        }

        let check = PolicyCheckRequest {
            action: request.action.clone(),
            actor: request.actor.clone(),
            resource: request.resource.clone(),
            context: request.context.clone(),
            request_id: request.request_id.clone(),
            simulate: false,
        };
        let decision = self.policy.check(&check).await?;
        if !decision.allowed {
            return Ok(GatedWriteOutcome::Denied { decision });
        }

        let result = domain_write().await?;

        self.audit
            .append(AppendRequest {
                event_type: format!("kernel.write.{}", request.action),
                actor: Actor::new(request.actor.clone()),
                payload: result.clone(),
                manifest_signature_id: None,
                retention_expires_at: None,
            })
            .await?;

        self.idempotency
            .put(IdempotencyRecord {
                key: request.idempotency_key.clone(),
                request_hash,
                result: result.clone(),
                expires_at: Utc::now() + self.ttl,
            })
            .await?;

        Ok(GatedWriteOutcome::Applied { result, decision })
    }
}

fn normalized_hash(request: &GatedWriteRequest) -> KernelResult<[u8; 32]> {
    let mut map = std::collections::BTreeMap::new();
    map.insert("action".to_string(), JsonValue::String(request.action.clone()));
    map.insert("actor".to_string(), JsonValue::String(request.actor.clone()));
    map.insert("resource".to_string(), request.resource.clone());
    map.insert("context".to_string(), request.context.clone());
    let normalized = JsonValue::Object(map);
    sentinel_canon::digest_serde(&normalized)
        .map_err(|e| KernelError::DomainWrite(format!("failed to hash request: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idempotency::InMemoryIdempotencyStore;
    use sentinel_audit::{AuditEngine, InMemoryAuditStore};
    use sentinel_crypto::{local::LocalEphemeralSigner, Signer};
    use std::time::Duration;

    fn coordinator() -> GatedWriteCoordinator {
        let signer = Arc::new(Signer::new(
            Arc::new(LocalEphemeralSigner::generate("test-kid")),
            Duration::from_secs(5),
        ));
        let audit = Arc::new(AuditEngine::new(Arc::new(InMemoryAuditStore::new()), signer));
        let policy = Arc::new(PolicyEngine::new());
        GatedWriteCoordinator::new(policy, audit, Arc::new(InMemoryIdempotencyStore::new()))
    }

    fn request(key: &str) -> GatedWriteRequest {
        GatedWriteRequest {
            idempotency_key: key.to_string(),
            action: "memory.write".to_string(),
            actor: "svc-a".to_string(),
            resource: JsonValue::Null,
            context: JsonValue::Null,
            request_id: None,
        }
    }

    #[tokio::test]
    async fn applies_write_once_and_replays_on_repeat_key() {
        let coordinator = coordinator();
        let calls = Arc::new(std::sync::atomic::AtomicU64::new(0));

        let calls_clone = calls.clone();
        let outcome1 = coordinator
            .execute(request("k1"), || async move {
                calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(JsonValue::String("applied".to_string()))
            })
            .await
            .unwrap();
        assert!(matches!(outcome1, GatedWriteOutcome::Applied { .. }));

        let calls_clone = calls.clone();
        let outcome2 = coordinator
            .execute(request("k1"), || async move {
                calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(JsonValue::String("applied".to_string()))
            })
            .await
            .unwrap();
        assert!(matches!(outcome2, GatedWriteOutcome::Replayed { .. }));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn same_key_different_body_conflicts() {
        let coordinator = coordinator();
        coordinator
            .execute(request("k2"), || async { Ok(JsonValue::Null) })
            .await
            .unwrap();

        let mut second = request("k2");
        second.action = "memory.delete".to_string();
        let err = coordinator
            .execute(second, || async { Ok(JsonValue::Null) })
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::IdempotencyKeyConflict(_)));
    }
}
