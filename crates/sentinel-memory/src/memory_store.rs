//! In-process `MemoryStore` for tests and single-node deployments.

use crate::artifact::resolve_artifact;
use crate::error::{MemoryError, MemoryResult};
use crate::store::{CreatedNode, MemoryStore};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use sentinel_types::{
    Artifact, ArtifactId, MemoryNode, MemoryNodeId, MemoryNodeInput, MemoryVector, MemoryVectorId,
    ReasoningGraphJob, ReasoningGraphJobStatus, VectorStatus,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryMemoryStore {
    nodes: Mutex<HashMap<String, MemoryNode>>,
    vectors: Mutex<HashMap<String, MemoryVector>>,
    vector_namespaces: Mutex<HashSet<(String, String)>>,
    artifacts: Mutex<Vec<Artifact>>,
    reasoning_jobs: Mutex<Vec<ReasoningGraphJob>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn create_node(
        &self,
        input: MemoryNodeInput,
        inherited_manifest_signature_id: Option<String>,
    ) -> MemoryResult<CreatedNode> {
        let now = Utc::now();
        let expires_at = input.ttl_seconds.map(|secs| now + ChronoDuration::seconds(secs));
        let node_id = MemoryNodeId::generate();

        let node = MemoryNode {
            id: node_id.clone(),
            owner: input.owner,
            embedding_id: None,
            metadata: input.metadata,
            pii_flags: input.pii_flags,
            legal_hold: input.legal_hold,
            ttl_seconds: input.ttl_seconds,
            expires_at,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        let vector = if let Some(embedding) = input.embedding {
            let key = (node_id.as_str().to_string(), embedding.namespace.clone());
            let mut namespaces = self.vector_namespaces.lock().expect("lock poisoned");
            if namespaces.contains(&key) {
                return Err(MemoryError::DuplicateVector(embedding.namespace));
            }
            namespaces.insert(key);
            drop(namespaces);

            let vector = MemoryVector {
                id: MemoryVectorId::generate(),
                memory_node_id: node_id.clone(),
                provider: embedding.provider,
                namespace: embedding.namespace,
                embedding_model: embedding.model,
                dimension: embedding.dimension,
                external_vector_id: None,
                status: VectorStatus::Pending,
                error: None,
                vector_data: embedding.vector,
                metadata: sentinel_types::JsonValue::Null,
                created_at: now,
            };
            self.vectors
                .lock()
                .expect("lock poisoned")
                .insert(vector.id.as_str().to_string(), vector.clone());
            Some(vector)
        } else {
            None
        };

        let mut artifacts = Vec::new();
        {
            let mut store = self.artifacts.lock().expect("lock poisoned");
            for artifact_input in &input.artifacts {
                let (sha256, manifest_signature_id) =
                    resolve_artifact(artifact_input, inherited_manifest_signature_id.as_deref())?;
                if store
                    .iter()
                    .any(|a| a.artifact_url == artifact_input.artifact_url && a.sha256 == sha256)
                {
                    continue;
                }
                let artifact = Artifact {
                    id: ArtifactId::generate(),
                    memory_node_id: node_id.clone(),
                    artifact_url: artifact_input.artifact_url.clone(),
                    sha256,
                    manifest_signature_id,
                    created_at: now,
                };
                store.push(artifact.clone());
                artifacts.push(artifact);
            }
        }

        self.nodes
            .lock()
            .expect("lock poisoned")
            .insert(node_id.as_str().to_string(), node.clone());

        self.reasoning_jobs.lock().expect("lock poisoned").push(ReasoningGraphJob {
            memory_node_id: node_id,
            status: ReasoningGraphJobStatus::Pending,
            created_at: now,
        });

        Ok(CreatedNode { node, vector, artifacts })
    }

    async fn get_node(&self, id: &MemoryNodeId) -> MemoryResult<Option<MemoryNode>> {
        Ok(self.nodes.lock().expect("lock poisoned").get(id.as_str()).cloned())
    }

    async fn set_legal_hold(&self, id: &MemoryNodeId, legal_hold: bool) -> MemoryResult<MemoryNode> {
        let mut nodes = self.nodes.lock().expect("lock poisoned");
        let node = nodes
            .get_mut(id.as_str())
            .ok_or_else(|| MemoryError::NodeNotFound(id.clone()))?;
        node.legal_hold = legal_hold;
        node.updated_at = Utc::now();
        Ok(node.clone())
    }

    async fn claim_pending_vectors(&self, batch_size: usize) -> MemoryResult<Vec<MemoryVector>> {
        let vectors = self.vectors.lock().expect("lock poisoned");
        let mut pending: Vec<MemoryVector> = vectors
            .values()
            .filter(|v| v.status != VectorStatus::Completed)
            .cloned()
            .collect();
        pending.sort_by_key(|v| v.created_at);
        pending.truncate(batch_size);
        Ok(pending)
    }

    async fn complete_vector(&self, id: &MemoryVectorId, external_vector_id: String) -> MemoryResult<()> {
        let mut vectors = self.vectors.lock().expect("lock poisoned");
        let vector = vectors
            .get_mut(id.as_str())
            .ok_or_else(|| MemoryError::VectorNotFound(id.clone()))?;
        vector.status = VectorStatus::Completed;
        vector.external_vector_id = Some(external_vector_id);
        vector.error = None;
        Ok(())
    }

    async fn fail_vector(&self, id: &MemoryVectorId, error: String) -> MemoryResult<()> {
        let mut vectors = self.vectors.lock().expect("lock poisoned");
        let vector = vectors
            .get_mut(id.as_str())
            .ok_or_else(|| MemoryError::VectorNotFound(id.clone()))?;
        vector.status = VectorStatus::Error;
        vector.error = Some(error);
        Ok(())
    }

    async fn queue_depth(&self, namespace: &str) -> MemoryResult<u64> {
        let vectors = self.vectors.lock().expect("lock poisoned");
        Ok(vectors
            .values()
            .filter(|v| v.namespace == namespace && v.status != VectorStatus::Completed)
            .count() as u64)
    }

    async fn pending_reasoning_jobs(&self) -> MemoryResult<Vec<ReasoningGraphJob>> {
        Ok(self
            .reasoning_jobs
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|j| j.status == ReasoningGraphJobStatus::Pending)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_types::EmbeddingInput;
    use std::collections::BTreeMap;

    fn input_with_embedding() -> MemoryNodeInput {
        MemoryNodeInput {
            owner: "svc-a".to_string(),
            metadata: sentinel_types::JsonValue::Null,
            pii_flags: BTreeMap::new(),
            legal_hold: false,
            ttl_seconds: Some(3600),
            embedding: Some(EmbeddingInput {
                model: "text-embed-3".to_string(),
                dimension: 3,
                namespace: "default".to_string(),
                provider: "local".to_string(),
                vector: vec![0.1, 0.2, 0.3],
            }),
            artifacts: Vec::new(),
        }
    }

    #[tokio::test]
    async fn creates_node_with_pending_vector_and_reasoning_job() {
        let store = InMemoryMemoryStore::new();
        let created = store.create_node(input_with_embedding(), None).await.unwrap();
        assert!(created.node.expires_at.is_some());
        assert_eq!(created.vector.unwrap().status, VectorStatus::Pending);
        assert_eq!(store.pending_reasoning_jobs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn vector_worker_claim_and_complete_cycle() {
        let store = InMemoryMemoryStore::new();
        let created = store.create_node(input_with_embedding(), None).await.unwrap();
        let vector_id = created.vector.unwrap().id;

        let claimed = store.claim_pending_vectors(10).await.unwrap();
        assert_eq!(claimed.len(), 1);

        store.complete_vector(&vector_id, "ext-1".to_string()).await.unwrap();
        let claimed_again = store.claim_pending_vectors(10).await.unwrap();
        assert!(claimed_again.is_empty());
    }

    #[tokio::test]
    async fn legal_hold_can_be_toggled() {
        let store = InMemoryMemoryStore::new();
        let created = store
            .create_node(
                MemoryNodeInput {
                    owner: "svc-a".to_string(),
                    metadata: sentinel_types::JsonValue::Null,
                    pii_flags: BTreeMap::new(),
                    legal_hold: false,
                    ttl_seconds: None,
                    embedding: None,
                    artifacts: Vec::new(),
                },
                None,
            )
            .await
            .unwrap();
        let updated = store.set_legal_hold(&created.node.id, true).await.unwrap();
        assert!(updated.legal_hold);
    }
}
