//! The deferred vector-write worker: drains `memoryVectors` rows that
//! aren't `completed`, validates their shape, and calls out to a pluggable
//! vector-database adapter.

use crate::error::MemoryResult;
use crate::store::MemoryStore;
use async_trait::async_trait;
use sentinel_types::{JsonValue, MemoryNodeId, MemoryVector};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[async_trait]
pub trait VectorAdapter: Send + Sync {
    /// Upsert a vector into the external index; returns the adapter's own
    /// identifier for the row on success.
    async fn upsert(
        &self,
        memory_node_id: &MemoryNodeId,
        vector: &[f32],
        metadata: &JsonValue,
    ) -> Result<String, String>;
}

#[derive(Debug, Default)]
pub struct WorkerPassReport {
    pub claimed: usize,
    pub completed: usize,
    pub errored: usize,
    pub queue_depth_by_namespace: HashMap<String, u64>,
}

pub struct VectorWorker {
    store: Arc<dyn MemoryStore>,
    adapter: Arc<dyn VectorAdapter>,
    interval: Duration,
    batch_size: usize,
}

impl VectorWorker {
    pub fn new(store: Arc<dyn MemoryStore>, adapter: Arc<dyn VectorAdapter>) -> Self {
        Self {
            store,
            adapter,
            interval: DEFAULT_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One drain pass: claim up to `batch_size` rows, validate and upsert
    /// each. Rows are drained `createdAt` ASC but completion order is not
    /// guaranteed. Queue depth is recomputed once per namespace touched.
    pub async fn run_once(&self) -> MemoryResult<WorkerPassReport> {
        let rows = self.store.claim_pending_vectors(self.batch_size).await?;
        let mut report = WorkerPassReport {
            claimed: rows.len(),
            ..Default::default()
        };

        let mut namespaces = std::collections::HashSet::new();
        for row in &rows {
            namespaces.insert(row.namespace.clone());
            match self.process_row(row).await {
                Ok(()) => report.completed += 1,
                Err(()) => report.errored += 1,
            }
        }

        for namespace in namespaces {
            let depth = self.store.queue_depth(&namespace).await?;
            report.queue_depth_by_namespace.insert(namespace, depth);
        }

        Ok(report)
    }

    async fn process_row(&self, row: &MemoryVector) -> Result<(), ()> {
        if !valid_vector_shape(&row.vector_data, row.dimension) {
            warn!(vector_id = %row.id, "invalid vector shape, marking permanently errored");
            let _ = self.store.fail_vector(&row.id, "invalid_data: shape mismatch".to_string()).await;
            return Err(());
        }

        match self.adapter.upsert(&row.memory_node_id, &row.vector_data, &row.metadata).await {
            Ok(external_id) => {
                if let Err(err) = self.store.complete_vector(&row.id, external_id).await {
                    warn!(vector_id = %row.id, error = %err, "failed to persist completed vector");
                    return Err(());
                }
                info!(vector_id = %row.id, "vector upserted");
                Ok(())
            }
            Err(adapter_err) => {
                let _ = self
                    .store
                    .fail_vector(&row.id, format!("adapter_error: {adapter_err}"))
                    .await;
                Err(())
            }
        }
    }
}

fn valid_vector_shape(data: &[f32], dimension: u32) -> bool {
    !data.is_empty() && data.len() as u32 == dimension && data.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryMemoryStore;
    use sentinel_types::{EmbeddingInput, MemoryNodeInput};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FakeAdapter {
        fail_next: bool,
        calls: AtomicU64,
    }

    #[async_trait]
    impl VectorAdapter for FakeAdapter {
        async fn upsert(&self, _node: &MemoryNodeId, _vector: &[f32], _metadata: &JsonValue) -> Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next {
                Err("timeout".to_string())
            } else {
                Ok("ext-1".to_string())
            }
        }
    }

    #[tokio::test]
    async fn successful_upsert_marks_completed() {
        let store: Arc<dyn MemoryStore> = Arc::new(InMemoryMemoryStore::new());
        store
            .create_node(
                MemoryNodeInput {
                    owner: "svc-a".to_string(),
                    metadata: JsonValue::Null,
                    pii_flags: BTreeMap::new(),
                    legal_hold: false,
                    ttl_seconds: None,
                    embedding: Some(EmbeddingInput {
                        model: "m".to_string(),
                        dimension: 2,
                        namespace: "ns".to_string(),
                        provider: "local".to_string(),
                        vector: vec![0.1, 0.2],
                    }),
                    artifacts: Vec::new(),
                },
                None,
            )
            .await
            .unwrap();

        let adapter = Arc::new(FakeAdapter { fail_next: false, calls: AtomicU64::new(0) });
        let worker = VectorWorker::new(store.clone(), adapter.clone());
        let report = worker.run_once().await.unwrap();
        assert_eq!(report.claimed, 1);
        assert_eq!(report.completed, 1);
        assert_eq!(*report.queue_depth_by_namespace.get("ns").unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_shape_is_marked_error_without_calling_adapter() {
        let store: Arc<dyn MemoryStore> = Arc::new(InMemoryMemoryStore::new());
        store
            .create_node(
                MemoryNodeInput {
                    owner: "svc-a".to_string(),
                    metadata: JsonValue::Null,
                    pii_flags: BTreeMap::new(),
                    legal_hold: false,
                    ttl_seconds: None,
                    embedding: Some(EmbeddingInput {
                        model: "m".to_string(),
                        dimension: 5,
                        namespace: "ns".to_string(),
                        provider: "local".to_string(),
                        vector: vec![0.1, 0.2],
                    }),
                    artifacts: Vec::new(),
                },
                None,
            )
            .await
            .unwrap();

        let adapter = Arc::new(FakeAdapter { fail_next: false, calls: AtomicU64::new(0) });
        let worker = VectorWorker::new(store, adapter.clone());
        let report = worker.run_once().await.unwrap();
        assert_eq!(report.errored, 1);
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    }
}
