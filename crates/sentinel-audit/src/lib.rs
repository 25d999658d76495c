//! Hash-chained, signed audit event storage.
//!
//! `AuditEngine` wraps an `AuditStore` backend with the retry policy for
//! transient infrastructure failures and best-effort post-commit hooks
//! (publish, archive). `verifier::verify_chain` independently checks an
//! existing chain's integrity.

pub mod archive;
pub mod engine;
pub mod error;
pub mod hashing;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod verifier;

pub use archive::{Archiver, LocalGzipArchiver};
pub use engine::{AuditEngine, AuditMetrics, NoopPublisher, Publisher};
pub use error::{AuditError, AuditResult};
pub use memory::InMemoryAuditStore;
pub use postgres::PostgresAuditStore;
pub use store::{AppendRequest, AuditStore, QueryWindow, StoredEvent};
pub use verifier::{verify_chain, ChainViolation, VerificationReport};

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_crypto::{Signer, SignerConfig};
    use sentinel_types::{Actor, JsonValue};
    use std::sync::Arc;

    #[tokio::test]
    async fn engine_retries_are_not_needed_for_inmemory_happy_path() {
        let store: Arc<dyn AuditStore> = Arc::new(InMemoryAuditStore::new());
        let signer = Arc::new(Signer::select(SignerConfig::default()).unwrap());
        let engine = AuditEngine::new(store, signer);

        let request = AppendRequest {
            event_type: "policy.decision".to_string(),
            actor: Actor::new("sentinel-kernel"),
            payload: JsonValue::Null,
            manifest_signature_id: None,
            retention_expires_at: None,
        };

        let stored = engine.append(request).await.unwrap();
        assert_eq!(stored.sequence, 1);
        assert_eq!(engine.metrics().write_success_total.load(std::sync::atomic::Ordering::Relaxed), 1);
    }
}
