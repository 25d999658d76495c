//! Digest signing with pluggable backends.
//!
//! `Signer::sign` picks a backend at construction time from a priority
//! list — KMS, then signing proxy, then local ephemeral key — and
//! enforces a timeout/retry/`requireKms` policy. Signing happens inside
//! the audit-write transaction (`sentinel-audit`): if it fails and the
//! environment requires a real signer, the caller rolls back.

#![deny(unsafe_code)]

pub mod backend;
pub mod error;
pub mod local;
pub mod registry;
pub mod remote;

pub use backend::SigningBackend;
pub use error::{SigningError, SigningResult};
pub use local::{verify_with_key, LocalEphemeralSigner};
pub use registry::{InMemoryKeyRegistry, KeyRegistry};
pub use remote::{KmsSigner, SigningProxySigner};

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Backend selection plus timeout/retry policy.
pub struct Signer {
    backend: Arc<dyn SigningBackend>,
    timeout: Duration,
}

/// Configuration inputs that determine which backend `Signer::select`
/// picks.
pub struct SignerConfig {
    pub kms_key_id: Option<String>,
    pub kms_endpoint: Option<String>,
    pub signing_proxy_url: Option<String>,
    pub require_kms: bool,
    pub is_production: bool,
    pub local_kid: String,
    pub timeout: Duration,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            kms_key_id: None,
            kms_endpoint: None,
            signing_proxy_url: None,
            require_kms: false,
            is_production: false,
            local_kid: "local-dev".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl Signer {
    /// Build from an explicit backend (used by tests and by callers that
    /// already constructed a `SigningBackend`, e.g. with a pre-seeded
    /// `LocalEphemeralSigner` shared with a `KeyRegistry`).
    pub fn new(backend: Arc<dyn SigningBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Select a backend per the priority list above. Fails hard
    /// (`KmsRequired`) rather than falling back to a local key when
    /// `require_kms` is set or the environment is production and neither a
    /// KMS key id nor a signing-proxy URL is configured.
    pub fn select(config: SignerConfig) -> SigningResult<Self> {
        let backend: Arc<dyn SigningBackend> = if let Some(key_id) = &config.kms_key_id {
            let endpoint = config
                .kms_endpoint
                .clone()
                .unwrap_or_else(|| "https://kms.internal/sign".to_string());
            Arc::new(KmsSigner::new(endpoint, key_id.clone(), config.timeout))
        } else if let Some(url) = &config.signing_proxy_url {
            Arc::new(SigningProxySigner::new(
                url.clone(),
                config.local_kid.clone(),
                config.timeout,
            ))
        } else if config.require_kms || config.is_production {
            return Err(SigningError::KmsRequired);
        } else {
            Arc::new(LocalEphemeralSigner::generate(config.local_kid.clone()))
        };

        Ok(Self {
            backend,
            timeout: config.timeout,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Sign a 32-byte digest, returning `(signature base64, signer_kid)`.
    /// Performs exactly one retry on a transient error, each attempt
    /// bounded by `timeout`.
    pub async fn sign(&self, digest: &[u8; 32]) -> SigningResult<(String, String)> {
        let attempt = self.sign_once(digest).await;
        let (bytes, kid) = match attempt {
            Ok(ok) => ok,
            Err(SigningError::Transient(msg)) => {
                warn!(error = %msg, backend = self.backend.name(), "signing attempt failed, retrying once");
                self.sign_once(digest).await?
            }
            Err(SigningError::Timeout) => {
                warn!(backend = self.backend.name(), "signing attempt timed out, retrying once");
                self.sign_once(digest).await?
            }
            Err(other) => return Err(other),
        };

        Ok((
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &bytes),
            kid,
        ))
    }

    async fn sign_once(&self, digest: &[u8; 32]) -> SigningResult<(Vec<u8>, String)> {
        match tokio::time::timeout(self.timeout, self.backend.sign(digest)).await {
            Ok(result) => result,
            Err(_) => Err(SigningError::Timeout),
        }
    }

    /// Verify a base64 signature over a digest, using the backend's own
    /// key when it is authoritative, falling back to an explicit
    /// `KeyRegistry` otherwise (the path remote backends always take,
    /// since KMS/proxy key material stays server-side).
    pub fn verify(
        &self,
        digest: &[u8; 32],
        signature_b64: &str,
        kid: &str,
        registry: Option<&dyn KeyRegistry>,
        at: chrono::DateTime<chrono::Utc>,
    ) -> bool {
        let Ok(sig) = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, signature_b64) else {
            return false;
        };
        if self.backend.verify(digest, &sig, kid) {
            return true;
        }
        match registry.and_then(|r| r.lookup(kid, at)) {
            Some(key) => verify_with_key(digest, &sig, &key),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_fallback_used_when_not_required() {
        let signer = Signer::select(SignerConfig::default()).unwrap();
        assert_eq!(signer.backend_name(), "local-ephemeral");
        let (sig, kid) = signer.sign(&[1u8; 32]).await.unwrap();
        assert!(!sig.is_empty());
        assert_eq!(kid, "local-dev");
    }

    #[test]
    fn require_kms_without_backend_fails_hard() {
        let config = SignerConfig {
            require_kms: true,
            ..Default::default()
        };
        let err = Signer::select(config).unwrap_err();
        assert!(matches!(err, SigningError::KmsRequired));
    }

    #[test]
    fn production_without_backend_fails_hard() {
        let config = SignerConfig {
            is_production: true,
            ..Default::default()
        };
        let err = Signer::select(config).unwrap_err();
        assert!(matches!(err, SigningError::KmsRequired));
    }

    #[tokio::test]
    async fn sign_then_verify_round_trip_with_registry() {
        let local = LocalEphemeralSigner::generate("kid-x");
        let registry = InMemoryKeyRegistry::new();
        registry.register(
            "kid-x",
            local.verifying_key(),
            chrono::Utc::now() - chrono::Duration::seconds(1),
            None,
        );
        let signer = Signer::new(Arc::new(local), Duration::from_secs(1));
        let digest = [9u8; 32];
        let (sig, kid) = signer.sign(&digest).await.unwrap();
        assert!(signer.verify(&digest, &sig, &kid, Some(&registry), chrono::Utc::now()));
    }
}
