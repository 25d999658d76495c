//! The allocation lifecycle: `pending -> (pending_finance | pending_multisig
//! | applied | rejected) -> applied | rejected`, gated by the policy
//! engine, Finance ledger-proof verification, and multisig quorum.

use crate::error::{WorkflowError, WorkflowResult};
use crate::quorum::evaluate_quorum;
use chrono::Utc;
use sentinel_audit::{AppendRequest, AuditEngine};
use sentinel_crypto::registry::KeyRegistry;
use sentinel_crypto::local::verify_with_key;
use sentinel_policy::PolicyEngine;
use sentinel_types::{
    Actor, AllocationId, AllocationRequest, AllocationStatus, JsonValue, PolicyCheckRequest,
    Settlement, Upgrade, UpgradeApproval,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Allocations whose |delta| meets or exceeds this require a 3-of-5
/// multisig before they may apply.
pub const DEFAULT_MAX_AUTO_APPLY: f64 = 100_000.0;

pub struct AllocationEngine {
    policy: Arc<PolicyEngine>,
    audit: Arc<AuditEngine>,
    key_registry: Arc<dyn KeyRegistry>,
    max_auto_apply: f64,
    allocations: Mutex<HashMap<String, AllocationRequest>>,
}

impl AllocationEngine {
    pub fn new(policy: Arc<PolicyEngine>, audit: Arc<AuditEngine>, key_registry: Arc<dyn KeyRegistry>) -> Self {
        Self {
            policy,
            audit,
            key_registry,
            max_auto_apply: DEFAULT_MAX_AUTO_APPLY,
            allocations: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_auto_apply(mut self, max_auto_apply: f64) -> Self {
        self.max_auto_apply = max_auto_apply;
        self
    }

    /// Submits a fresh allocation request: checks `allocation.request`
    /// against the policy engine, then routes to `pending_finance`,
    /// `pending_multisig`, or directly `applied`/`rejected`.
    pub async fn request_allocation(&self, mut request: AllocationRequest, actor: &str) -> WorkflowResult<AllocationRequest> {
        let check = PolicyCheckRequest {
            action: "allocation.request".to_string(),
            actor: actor.to_string(),
            resource: JsonValue::from_serde_json(
                serde_json::json!({ "pool": request.pool, "delta": request.delta, "entityId": request.entity_id }),
            ),
            context: JsonValue::Null,
            request_id: None,
            simulate: false,
        };
        let decision = self.policy.check(&check).await?;
        request.sentinel_decision = Some(decision.decision_id.to_string());

        if !decision.allowed {
            request.status = AllocationStatus::Rejected;
            self.emit(&request, "allocation.rejected", actor).await?;
        } else if request.delta.abs() >= self.max_auto_apply {
            request.status = AllocationStatus::PendingMultisig;
            self.emit(&request, "allocation.request", actor).await?;
        } else if !request.pool.is_empty() {
            request.status = AllocationStatus::PendingFinance;
            self.emit(&request, "allocation.request", actor).await?;
        } else {
            request.status = AllocationStatus::Applied;
            request.applied_by = Some(actor.to_string());
            request.applied_at = Some(Utc::now());
            self.emit(&request, "allocation.applied", actor).await?;
        }

        self.allocations
            .lock()
            .expect("allocation map lock poisoned")
            .insert(request.id.as_str().to_string(), request.clone());
        Ok(request)
    }

    /// Finance returns a signed, balanced settlement; verified by
    /// signature and entry balance before the allocation applies.
    pub async fn apply_settlement(&self, settlement: Settlement, actor: &str) -> WorkflowResult<AllocationRequest> {
        let mut allocation = self.get(&settlement.allocation_id)?;
        if allocation.status.is_terminal() {
            return Err(WorkflowError::AlreadyTerminal { id: allocation.id.clone() });
        }

        if !settlement.is_balanced() {
            return Err(WorkflowError::SettlementUnbalanced);
        }

        let digest = sentinel_canon::digest_serde(&settlement.ledger_lines)
            .map_err(|e| WorkflowError::Policy(sentinel_policy::PolicyError::RuleParse(e.to_string())))?;
        let key = self
            .key_registry
            .lookup(&settlement.signer_kid, settlement.ts)
            .ok_or(WorkflowError::SettlementSignatureInvalid)?;
        let signature_bytes = base64_decode(&settlement.signature);
        if !verify_with_key(&digest, &signature_bytes, &key) {
            return Err(WorkflowError::SettlementSignatureInvalid);
        }

        allocation.status = AllocationStatus::Applied;
        allocation.applied_by = Some(actor.to_string());
        allocation.applied_at = Some(Utc::now());
        self.emit(&allocation, "allocation.settlement", actor).await?;
        self.store(allocation.clone());
        Ok(allocation)
    }

    /// Evaluate quorum for a pending-multisig allocation; applies it once
    /// 3-of-5 (or configured) unique approvals land.
    pub async fn apply_quorum(
        &self,
        allocation_id: &AllocationId,
        upgrade: &Upgrade,
        approvals: &[UpgradeApproval],
        actor: &str,
    ) -> WorkflowResult<AllocationRequest> {
        let mut allocation = self.get(allocation_id)?;
        if allocation.status.is_terminal() {
            return Err(WorkflowError::AlreadyTerminal { id: allocation.id.clone() });
        }

        let quorum = evaluate_quorum(upgrade, approvals);
        if !quorum.has_quorum {
            return Ok(allocation);
        }

        allocation.status = AllocationStatus::Applied;
        allocation.applied_by = Some(actor.to_string());
        allocation.applied_at = Some(Utc::now());
        self.emit(&allocation, "allocation.applied", actor).await?;
        self.store(allocation.clone());
        Ok(allocation)
    }

    pub fn get(&self, id: &AllocationId) -> WorkflowResult<AllocationRequest> {
        self.allocations
            .lock()
            .expect("allocation map lock poisoned")
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| WorkflowError::AllocationNotFound(id.clone()))
    }

    fn store(&self, allocation: AllocationRequest) {
        self.allocations
            .lock()
            .expect("allocation map lock poisoned")
            .insert(allocation.id.as_str().to_string(), allocation);
    }

    async fn emit(&self, allocation: &AllocationRequest, event_type: &str, actor: &str) -> WorkflowResult<()> {
        let payload = JsonValue::from_serde_json(
            serde_json::to_value(allocation).map_err(|e| WorkflowError::Audit(sentinel_audit::AuditError::Backend(e.to_string())))?,
        );
        self.audit
            .append(AppendRequest {
                event_type: event_type.to_string(),
                actor: Actor::new(actor.to_string()),
                payload,
                manifest_signature_id: None,
                retention_expires_at: None,
            })
            .await?;
        Ok(())
    }
}

fn base64_decode(input: &str) -> Vec<u8> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(input).unwrap_or_default()
}
