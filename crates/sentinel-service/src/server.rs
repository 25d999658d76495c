//! Wiring and lifecycle for `sentineld`: builds the crate graph from
//! config, mounts the router, and serves with graceful shutdown.

use crate::api::create_router;
use crate::config::{SentinelConfig, StorageConfig};
use crate::state::AppState;
use anyhow::{Context, Result};
use sentinel_audit::{AuditEngine, InMemoryAuditStore, PostgresAuditStore};
use sentinel_crypto::{InMemoryKeyRegistry, Signer, SignerConfig};
use sentinel_kernel::{GatedWriteCoordinator, InMemoryIdempotencyStore};
use sentinel_memory::{InMemoryMemoryStore, MemoryEngine, MemoryStore, PostgresMemoryStore};
use sentinel_policy::PolicyEngine;
use sentinel_workflow::{AllocationEngine, PromotionTracker, RoiMonitor};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct Server {
    config: SentinelConfig,
    state: AppState,
}

impl Server {
    pub async fn new(config: SentinelConfig) -> Result<Self> {
        let signer_config = SignerConfig {
            kms_key_id: config.crypto.audit_signing_kms_key_id.clone(),
            kms_endpoint: config.crypto.kms_endpoint.clone(),
            signing_proxy_url: config.crypto.signing_proxy_url.clone(),
            require_kms: config.effective_require_kms(),
            is_production: config.is_production(),
            local_kid: config.crypto.audit_signer_kid.clone(),
            timeout: Duration::from_secs(config.crypto.signer_timeout_secs),
        };
        let signer = Arc::new(Signer::select(signer_config).context("selecting signing backend")?);

        if config.effective_require_mtls() && config.integrations.sentinel_url.is_some() {
            tracing::warn!(
                "requireMtls is set but sentineld does not terminate mTLS itself; \
                 front the integration URLs with an mTLS-enforcing proxy or service mesh"
            );
        }

        let (audit_store, memory_store): (
            Arc<dyn sentinel_audit::AuditStore>,
            Arc<dyn MemoryStore>,
        ) = match &config.storage {
            StorageConfig::Memory => (
                Arc::new(InMemoryAuditStore::new()),
                Arc::new(InMemoryMemoryStore::new()),
            ),
            StorageConfig::Postgres { url, .. } => {
                let audit = PostgresAuditStore::connect(url)
                    .await
                    .context("connecting audit store to postgres")?;
                let memory = PostgresMemoryStore::connect(url)
                    .await
                    .context("connecting memory store to postgres")?;
                (Arc::new(audit), Arc::new(memory))
            }
        };

        let audit = Arc::new(AuditEngine::new(audit_store, signer));
        let policy = Arc::new(PolicyEngine::new().with_audit(audit.clone()));
        let idempotency = Arc::new(InMemoryIdempotencyStore::new());
        let kernel = Arc::new(
            GatedWriteCoordinator::new(policy.clone(), audit.clone(), idempotency)
                .with_ttl(chrono::Duration::seconds(config.kernel.idempotency_ttl_seconds)),
        );
        let memory = Arc::new(MemoryEngine::new(memory_store, kernel.clone()));

        let key_registry = Arc::new(InMemoryKeyRegistry::new());
        let allocation = Arc::new(
            AllocationEngine::new(policy.clone(), audit.clone(), key_registry)
                .with_max_auto_apply(config.workflow.max_auto_apply),
        );
        let promotion = Arc::new(PromotionTracker::new(
            config.workflow.promotion_threshold,
            config.workflow.promotion_hysteresis_windows,
        ));
        let roi = Arc::new(RoiMonitor::new(config.workflow.roi_window));

        let state = AppState {
            policy,
            audit,
            kernel,
            memory,
            allocation,
            promotion,
            roi,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        };

        Ok(Self { config, state })
    }

    pub async fn run(self) -> Result<()> {
        let addr = self.config.server.listen_addr;
        let app = create_router(self.state, &self.config);
        let listener = TcpListener::bind(addr).await.context("binding listen address")?;

        tracing::info!(%addr, "sentineld listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("serving http")?;

        tracing::info!("sentineld shutting down");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl+c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
