use crate::error::SigningResult;
use async_trait::async_trait;

/// A signing backend produces a signature over a 32-byte digest and
/// reports the key id (`kid`) it signed with. Implementations should
/// complete within the caller's timeout; `Signer` (in `lib.rs`) owns the
/// retry/timeout policy, not the backend.
#[async_trait]
pub trait SigningBackend: Send + Sync {
    /// Sign a 32-byte digest, returning `(signature_bytes, signer_kid)`.
    async fn sign(&self, digest: &[u8; 32]) -> SigningResult<(Vec<u8>, String)>;

    /// Verify a signature over a digest for a given kid, when this
    /// backend is authoritative for that kid's public key.
    fn verify(&self, digest: &[u8; 32], signature: &[u8], kid: &str) -> bool;

    /// Human-readable backend name, used in tracing and error messages.
    fn name(&self) -> &'static str;
}
