//! Retry/backoff wrapper around an `AuditStore`.
//!
//! The store itself performs the single-transaction append (lock, hash,
//! sign, insert, commit); this layer adds the retry policy for transient
//! infrastructure failures and the post-commit best-effort hooks
//! (publish, archive).

use crate::archive::Archiver;
use crate::error::{AuditError, AuditResult};
use crate::store::{AppendRequest, AuditStore, StoredEvent};
use sentinel_crypto::Signer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(200);

/// Something notified best-effort after a commit (a message bus in
/// production); failures here are logged, never rolled back.
pub trait Publisher: Send + Sync {
    fn publish(&self, event: &StoredEvent);
}

/// A `Publisher` that does nothing, for deployments without a bus.
#[derive(Default)]
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn publish(&self, _event: &StoredEvent) {}
}

#[derive(Default)]
pub struct AuditMetrics {
    pub write_success_total: AtomicU64,
    pub write_failure_total: AtomicU64,
}

pub struct AuditEngine {
    store: Arc<dyn AuditStore>,
    signer: Arc<Signer>,
    publisher: Arc<dyn Publisher>,
    archiver: Option<Arc<dyn Archiver>>,
    metrics: AuditMetrics,
}

impl AuditEngine {
    pub fn new(store: Arc<dyn AuditStore>, signer: Arc<Signer>) -> Self {
        Self {
            store,
            signer,
            publisher: Arc::new(NoopPublisher),
            archiver: None,
            metrics: AuditMetrics::default(),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    pub fn metrics(&self) -> &AuditMetrics {
        &self.metrics
    }

    /// `appendAuditEvent`: retries transient failures up to 3 times with
    /// exponential backoff starting at 200ms; non-transient failures
    /// surface immediately. Fires publish/archive best-effort after a
    /// successful commit.
    pub async fn append(&self, request: AppendRequest) -> AuditResult<StoredEvent> {
        let mut backoff = INITIAL_BACKOFF;
        let mut last_err = None;

        for attempt in 0..=MAX_RETRIES {
            match self.store.append_audit(request.clone(), &self.signer).await {
                Ok(stored) => {
                    self.metrics.write_success_total.fetch_add(1, Ordering::Relaxed);
                    self.post_commit(&stored);
                    return Ok(stored);
                }
                Err(err) if err.is_transient() && attempt < MAX_RETRIES => {
                    warn!(attempt, error = %err, "transient audit write failure, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    last_err = Some(err);
                }
                Err(err) => {
                    self.metrics.write_failure_total.fetch_add(1, Ordering::Relaxed);
                    return Err(err);
                }
            }
        }

        self.metrics.write_failure_total.fetch_add(1, Ordering::Relaxed);
        Err(last_err.unwrap_or(AuditError::Backend("audit append exhausted retries".to_string())))
    }

    fn post_commit(&self, stored: &StoredEvent) {
        self.publisher.publish(stored);
        if let Some(archiver) = &self.archiver {
            if let Err(err) = archiver.stage(stored) {
                warn!(error = %err, event_id = %stored.event.event_id, "archival staging failed");
            }
        }
        info!(event_id = %stored.event.event_id, sequence = stored.sequence, "audit event committed");
    }
}
