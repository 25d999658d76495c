//! The eval-to-promotion-to-allocation workflow: N-window hysteresis
//! promotion, policy-gated allocation requests, Finance settlement
//! verification, multisig quorum, and ROI-triggered demotion.

#![deny(unsafe_code)]

pub mod allocation;
pub mod error;
pub mod hysteresis;
pub mod quorum;
pub mod roi;

pub use allocation::{AllocationEngine, DEFAULT_MAX_AUTO_APPLY};
pub use error::{WorkflowError, WorkflowResult};
pub use hysteresis::{PromotionTracker, DEFAULT_WINDOW};
pub use quorum::evaluate_quorum;
pub use roi::RoiMonitor;

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_audit::{AuditEngine, InMemoryAuditStore};
    use sentinel_crypto::{InMemoryKeyRegistry, Signer, SignerConfig};
    use sentinel_policy::PolicyEngine;
    use sentinel_types::{AllocationId, AllocationRequest, AllocationStatus};
    use std::sync::Arc;

    fn engine() -> AllocationEngine {
        let store = Arc::new(InMemoryAuditStore::new());
        let signer = Arc::new(Signer::select(SignerConfig::default()).unwrap());
        let audit = Arc::new(AuditEngine::new(store, signer));
        let policy = Arc::new(PolicyEngine::new());
        let registry = Arc::new(InMemoryKeyRegistry::new());
        AllocationEngine::new(policy, audit, registry)
    }

    fn request(delta: f64, pool: &str) -> AllocationRequest {
        AllocationRequest {
            id: AllocationId::generate(),
            promotion_id: None,
            entity_id: "agent-1".to_string(),
            pool: pool.to_string(),
            delta,
            reason: "promotion".to_string(),
            status: AllocationStatus::Pending,
            sentinel_decision: None,
            applied_by: None,
            applied_at: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn small_unpooled_allocation_applies_immediately() {
        let engine = engine();
        let applied = engine.request_allocation(request(10.0, ""), "svc-a").await.unwrap();
        assert_eq!(applied.status, AllocationStatus::Applied);
    }

    #[tokio::test]
    async fn pooled_allocation_waits_for_finance() {
        let engine = engine();
        let pending = engine.request_allocation(request(10.0, "budget-pool"), "svc-a").await.unwrap();
        assert_eq!(pending.status, AllocationStatus::PendingFinance);
    }

    #[tokio::test]
    async fn large_delta_waits_for_multisig() {
        let engine = engine();
        let pending = engine
            .request_allocation(request(DEFAULT_MAX_AUTO_APPLY + 1.0, ""), "svc-a")
            .await
            .unwrap();
        assert_eq!(pending.status, AllocationStatus::PendingMultisig);
    }
}
