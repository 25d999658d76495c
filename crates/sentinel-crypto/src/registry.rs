//! Public-key registry for `verify`: an audit event's signature is
//! verifiable iff its `signerKid` resolves to a public key that was
//! valid at the event's timestamp.

use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Clone)]
struct RegisteredKey {
    key: VerifyingKey,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
}

/// An in-memory registry of signer public keys, keyed by `kid`. Production
/// deployments would back this with the same durable store as `sentinel-audit`;
/// the trait boundary is `KeyRegistry` so that substitution doesn't touch
/// callers.
pub trait KeyRegistry: Send + Sync {
    fn lookup(&self, kid: &str, at: DateTime<Utc>) -> Option<VerifyingKey>;
}

#[derive(Default)]
pub struct InMemoryKeyRegistry {
    keys: RwLock<HashMap<String, Vec<RegisteredKey>>>,
}

impl InMemoryKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        kid: impl Into<String>,
        key: VerifyingKey,
        valid_from: DateTime<Utc>,
        valid_until: Option<DateTime<Utc>>,
    ) {
        let mut keys = self.keys.write().expect("registry lock poisoned");
        keys.entry(kid.into()).or_default().push(RegisteredKey {
            key,
            valid_from,
            valid_until,
        });
    }
}

impl KeyRegistry for InMemoryKeyRegistry {
    fn lookup(&self, kid: &str, at: DateTime<Utc>) -> Option<VerifyingKey> {
        let keys = self.keys.read().expect("registry lock poisoned");
        keys.get(kid)?
            .iter()
            .find(|k| k.valid_from <= at && k.valid_until.map(|u| at < u).unwrap_or(true))
            .map(|k| k.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalEphemeralSigner;

    #[test]
    fn lookup_respects_validity_window() {
        let signer = LocalEphemeralSigner::generate("kid-1");
        let registry = InMemoryKeyRegistry::new();
        let now = Utc::now();
        registry.register(
            "kid-1",
            signer.verifying_key(),
            now,
            Some(now + chrono::Duration::seconds(10)),
        );

        assert!(registry.lookup("kid-1", now).is_some());
        assert!(registry
            .lookup("kid-1", now + chrono::Duration::seconds(20))
            .is_none());
        assert!(registry
            .lookup("kid-1", now - chrono::Duration::seconds(1))
            .is_none());
    }
}
