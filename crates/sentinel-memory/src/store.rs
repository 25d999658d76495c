//! The memory-node store: one transactional insert binding node, optional
//! deferred vector, optional artifacts, and a reasoning-graph queue row.

use crate::error::MemoryResult;
use async_trait::async_trait;
use sentinel_types::{
    Artifact, MemoryNode, MemoryNodeId, MemoryNodeInput, MemoryVector, MemoryVectorId,
    ReasoningGraphJob,
};

#[derive(Clone, Debug)]
pub struct CreatedNode {
    pub node: MemoryNode,
    pub vector: Option<MemoryVector>,
    pub artifacts: Vec<Artifact>,
}

#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Inserts the node, an optional pending vector row, any artifacts,
    /// and a pending reasoning-graph queue row as one atomic unit.
    async fn create_node(
        &self,
        input: MemoryNodeInput,
        inherited_manifest_signature_id: Option<String>,
    ) -> MemoryResult<CreatedNode>;

    async fn get_node(&self, id: &MemoryNodeId) -> MemoryResult<Option<MemoryNode>>;

    /// Legal-hold transitions are audited by the caller; the store only
    /// persists the flag.
    async fn set_legal_hold(&self, id: &MemoryNodeId, legal_hold: bool) -> MemoryResult<MemoryNode>;

    /// Claim up to `batch_size` non-completed vector rows, oldest first.
    async fn claim_pending_vectors(&self, batch_size: usize) -> MemoryResult<Vec<MemoryVector>>;

    async fn complete_vector(&self, id: &MemoryVectorId, external_vector_id: String) -> MemoryResult<()>;

    async fn fail_vector(&self, id: &MemoryVectorId, error: String) -> MemoryResult<()>;

    async fn queue_depth(&self, namespace: &str) -> MemoryResult<u64>;

    async fn pending_reasoning_jobs(&self) -> MemoryResult<Vec<ReasoningGraphJob>>;
}
