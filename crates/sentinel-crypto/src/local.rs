//! Local ephemeral-key signer: a development/non-production fallback.
//! Never used when `requireKms` is set or the environment is production
//! (enforced by `Signer`, not by this type).

use crate::backend::SigningBackend;
use crate::error::SigningResult;
use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;

pub struct LocalEphemeralSigner {
    key: SigningKey,
    kid: String,
}

impl LocalEphemeralSigner {
    /// Generate a fresh ephemeral keypair for this process's lifetime.
    pub fn generate(kid: impl Into<String>) -> Self {
        let mut csprng = OsRng;
        Self {
            key: SigningKey::generate(&mut csprng),
            kid: kid.into(),
        }
    }

    pub fn from_bytes(bytes: [u8; 32], kid: impl Into<String>) -> Self {
        Self {
            key: SigningKey::from_bytes(&bytes),
            kid: kid.into(),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

#[async_trait]
impl SigningBackend for LocalEphemeralSigner {
    async fn sign(&self, digest: &[u8; 32]) -> SigningResult<(Vec<u8>, String)> {
        let sig: Signature = self.key.sign(digest);
        Ok((sig.to_bytes().to_vec(), self.kid.clone()))
    }

    fn verify(&self, digest: &[u8; 32], signature: &[u8], kid: &str) -> bool {
        if kid != self.kid {
            return false;
        }
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let sig = Signature::from_bytes(&sig_bytes);
        self.key.verifying_key().verify(digest, &sig).is_ok()
    }

    fn name(&self) -> &'static str {
        "local-ephemeral"
    }
}

/// Verify against an arbitrary known verifying key, independent of any
/// particular signer instance. Used by `sentinel-audit`'s chain verifier
/// and by `KeyRegistry` lookups.
pub fn verify_with_key(digest: &[u8; 32], signature: &[u8], key: &VerifyingKey) -> bool {
    let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    let sig = Signature::from_bytes(&sig_bytes);
    key.verify(digest, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_then_verify_round_trips() {
        let signer = LocalEphemeralSigner::generate("local-1");
        let digest = [7u8; 32];
        let (sig, kid) = signer.sign(&digest).await.unwrap();
        assert_eq!(kid, "local-1");
        assert!(signer.verify(&digest, &sig, &kid));
    }

    #[tokio::test]
    async fn verify_rejects_wrong_kid() {
        let signer = LocalEphemeralSigner::generate("local-1");
        let digest = [7u8; 32];
        let (sig, _kid) = signer.sign(&digest).await.unwrap();
        assert!(!signer.verify(&digest, &sig, "local-2"));
    }

    #[tokio::test]
    async fn verify_rejects_tampered_digest() {
        let signer = LocalEphemeralSigner::generate("local-1");
        let digest = [7u8; 32];
        let (sig, kid) = signer.sign(&digest).await.unwrap();
        assert!(!signer.verify(&[8u8; 32], &sig, &kid));
    }
}
