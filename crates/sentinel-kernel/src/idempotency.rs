//! Idempotency-key bookkeeping for gated writes: a request presenting a
//! key already seen with the same normalized body replays the stored
//! result; the same key with a different body is a conflict.

use crate::error::KernelResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinel_types::JsonValue;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Clone, Debug)]
pub struct IdempotencyRecord {
    pub key: String,
    pub request_hash: [u8; 32],
    pub result: JsonValue,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn get(&self, key: &str) -> KernelResult<Option<IdempotencyRecord>>;
    async fn put(&self, record: IdempotencyRecord) -> KernelResult<()>;
}

#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    records: Mutex<HashMap<String, IdempotencyRecord>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn get(&self, key: &str) -> KernelResult<Option<IdempotencyRecord>> {
        let mut records = self.records.lock().expect("idempotency store lock poisoned");
        if let Some(existing) = records.get(key) {
            if existing.expires_at < Utc::now() {
                records.remove(key);
                return Ok(None);
            }
        }
        Ok(records.get(key).cloned())
    }

    async fn put(&self, record: IdempotencyRecord) -> KernelResult<()> {
        let mut records = self.records.lock().expect("idempotency store lock poisoned");
        records.insert(record.key.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_key_returns_none() {
        let store = InMemoryIdempotencyStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_record_is_treated_as_absent() {
        let store = InMemoryIdempotencyStore::new();
        store
            .put(IdempotencyRecord {
                key: "k1".to_string(),
                request_hash: [0u8; 32],
                result: JsonValue::Null,
                expires_at: Utc::now() - chrono::Duration::seconds(1),
            })
            .await
            .unwrap();
        assert!(store.get("k1").await.unwrap().is_none());
    }
}
