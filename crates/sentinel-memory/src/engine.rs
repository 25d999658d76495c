//! Ties the memory store to the gated-write coordinator: `createMemoryNode`
//! goes through policy check and audit append like any other governed
//! write, and read paths apply PII redaction for callers without
//! `read:pii`.

use crate::error::{MemoryError, MemoryResult};
use crate::pii::redact_json;
use crate::store::MemoryStore;
use sentinel_kernel::{GatedWriteCoordinator, GatedWriteOutcome, GatedWriteRequest};
use sentinel_types::{JsonValue, MemoryNode, MemoryNodeId, MemoryNodeInput, RequestId};
use std::sync::Arc;

pub struct MemoryEngine {
    store: Arc<dyn MemoryStore>,
    coordinator: Arc<GatedWriteCoordinator>,
}

impl MemoryEngine {
    pub fn new(store: Arc<dyn MemoryStore>, coordinator: Arc<GatedWriteCoordinator>) -> Self {
        Self { store, coordinator }
    }

    /// Runs `createMemoryNode` under the governed-write envelope: a policy
    /// denial or an idempotency-key conflict short-circuits the domain
    /// write; on success the node (and whatever the store created with
    /// it) is returned.
    pub async fn create_memory_node(
        &self,
        input: MemoryNodeInput,
        actor: String,
        idempotency_key: String,
        request_id: Option<RequestId>,
        inherited_manifest_signature_id: Option<String>,
    ) -> MemoryResult<GatedWriteOutcome> {
        let resource = JsonValue::from_serde_json(
            serde_json::to_value(&input).map_err(|e| MemoryError::Backend(e.to_string()))?,
        );

        let request = GatedWriteRequest {
            idempotency_key,
            action: "memory.create_node".to_string(),
            actor,
            resource,
            context: JsonValue::Null,
            request_id,
        };

        let store = self.store.clone();
        let outcome = self
            .coordinator
            .execute(request, move || async move {
                let created = store
                    .create_node(input, inherited_manifest_signature_id)
                    .await
                    .map_err(|e| sentinel_kernel::KernelError::DomainWrite(e.to_string()))?;
                let payload = JsonValue::from_serde_json(
                    serde_json::to_value(&created.node)
                        .map_err(|e| sentinel_kernel::KernelError::DomainWrite(e.to_string()))?,
                );
                Ok(payload)
            })
            .await?;

        Ok(outcome)
    }

    /// Read a node, redacting PII fields when the caller lacks
    /// `read:pii`.
    pub async fn get_node(&self, id: &MemoryNodeId, has_pii_capability: bool) -> MemoryResult<Option<MemoryNode>> {
        let node = self.store.get_node(id).await?;
        Ok(node.map(|mut n| {
            if !has_pii_capability {
                n.metadata = redact_json(&n.metadata);
            }
            n
        }))
    }

    pub async fn set_legal_hold(&self, id: &MemoryNodeId, legal_hold: bool) -> MemoryResult<MemoryNode> {
        self.store.set_legal_hold(id, legal_hold).await
    }
}
