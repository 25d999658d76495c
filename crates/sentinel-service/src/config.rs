//! Configuration for `sentineld`.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Deployment environment. Drives the production-only defaults called out
/// in each section below (`requireKms`, `requireMtls`); everything else is
/// environment-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub integrations: IntegrationsConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub kernel: KernelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            crypto: CryptoConfig::default(),
            integrations: IntegrationsConfig::default(),
            policy: PolicyConfig::default(),
            workflow: WorkflowConfig::default(),
            kernel: KernelConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SentinelConfig {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// `requireKms` defaults to `true` in production unless explicitly set.
    pub fn effective_require_kms(&self) -> bool {
        self.crypto.require_kms.unwrap_or_else(|| self.is_production())
    }

    /// `requireMtls` defaults to `true` in production unless explicitly set.
    pub fn effective_require_mtls(&self) -> bool {
        self.integrations.require_mtls.unwrap_or_else(|| self.is_production())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8088".parse().unwrap(),
            enable_cors: true,
            request_timeout_secs: 30,
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

/// `databaseUrl` backs both the audit chain and the memory store unless
/// overridden; both crates run `Memory` in development.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    Memory,
    Postgres {
        url: String,
        #[serde(default = "default_pool_size")]
        max_connections: u32,
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory
    }
}

/// Mirrors `sentinel_crypto::SignerConfig`'s backend-selection priority:
/// KMS, then signing proxy, then an ephemeral local key (refused when
/// `require_kms` is set, which `SentinelConfig::effective_require_kms`
/// defaults to `true` in production).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    pub audit_signing_kms_key_id: Option<String>,
    pub kms_endpoint: Option<String>,
    pub signing_proxy_url: Option<String>,
    pub audit_signer_kid: String,
    /// `None` defers to `SentinelConfig::effective_require_kms` (true in
    /// production); `Some(_)` is an explicit operator override.
    #[serde(default)]
    pub require_kms: Option<bool>,
    #[serde(default = "default_signer_timeout")]
    pub signer_timeout_secs: u64,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            audit_signing_kms_key_id: None,
            kms_endpoint: None,
            signing_proxy_url: None,
            audit_signer_kid: "sentineld-local".to_string(),
            require_kms: None,
            signer_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    pub sentinel_url: Option<String>,
    pub finance_url: Option<String>,
    pub reasoning_graph_url: Option<String>,
    #[serde(default = "default_vector_provider")]
    pub vector_db_provider: String,
    #[serde(default = "default_vector_namespace")]
    pub vector_db_namespace: String,
    /// `None` defers to `SentinelConfig::effective_require_mtls` (true in
    /// production); `Some(_)` is an explicit operator override.
    #[serde(default)]
    pub require_mtls: Option<bool>,
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            sentinel_url: None,
            finance_url: None,
            reasoning_graph_url: None,
            vector_db_provider: default_vector_provider(),
            vector_db_namespace: default_vector_namespace(),
            require_mtls: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_rollback_threshold")]
    pub canary_rollback_threshold: f64,
    #[serde(default = "default_rollback_window_secs")]
    pub canary_rollback_window_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            canary_rollback_threshold: default_rollback_threshold(),
            canary_rollback_window_secs: default_rollback_window_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_promotion_threshold")]
    pub promotion_threshold: f64,
    #[serde(default = "default_hysteresis_windows")]
    pub promotion_hysteresis_windows: usize,
    #[serde(default = "default_roi_window")]
    pub roi_window: usize,
    #[serde(default)]
    pub upgrade_approver_ids: Vec<String>,
    #[serde(default = "default_required_approvals")]
    pub upgrade_required_approvals: u32,
    #[serde(default = "default_max_auto_apply")]
    pub max_auto_apply: f64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            promotion_threshold: default_promotion_threshold(),
            promotion_hysteresis_windows: default_hysteresis_windows(),
            roi_window: default_roi_window(),
            upgrade_approver_ids: Vec::new(),
            upgrade_required_approvals: default_required_approvals(),
            max_auto_apply: default_max_auto_apply(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default = "default_idempotency_ttl")]
    pub idempotency_ttl_seconds: i64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            idempotency_ttl_seconds: default_idempotency_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    10 * 1024 * 1024
}
fn default_pool_size() -> u32 {
    10
}
fn default_connection_timeout() -> u64 {
    5
}
fn default_signer_timeout() -> u64 {
    5
}
fn default_vector_provider() -> String {
    "none".to_string()
}
fn default_vector_namespace() -> String {
    "default".to_string()
}
fn default_rollback_threshold() -> f64 {
    0.5
}
fn default_rollback_window_secs() -> u64 {
    300
}
fn default_promotion_threshold() -> f64 {
    0.8
}
fn default_hysteresis_windows() -> usize {
    3
}
fn default_roi_window() -> usize {
    3
}
fn default_required_approvals() -> u32 {
    3
}
fn default_max_auto_apply() -> f64 {
    100_000.0
}
fn default_idempotency_ttl() -> i64 {
    24 * 60 * 60
}
fn default_log_level() -> String {
    "info".to_string()
}

impl SentinelConfig {
    /// Loads defaults, then an optional file, then `SENTINEL_`-prefixed
    /// environment variables, in that order of increasing precedence.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        builder = builder.add_source(config::Config::try_from(&SentinelConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SENTINEL")
                .separator("_")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_memory_backed_and_local_signed() {
        let config = SentinelConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8088);
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert!(!config.effective_require_kms());
    }

    #[test]
    fn production_defaults_require_kms_and_mtls_unless_overridden() {
        let mut config = SentinelConfig::default();
        config.environment = Environment::Production;
        assert!(config.effective_require_kms());
        assert!(config.effective_require_mtls());

        config.crypto.require_kms = Some(false);
        config.integrations.require_mtls = Some(false);
        assert!(!config.effective_require_kms());
        assert!(!config.effective_require_mtls());
    }
}
