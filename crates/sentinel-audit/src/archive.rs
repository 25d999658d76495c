//! Post-commit archival batching.
//!
//! `Archiver::stage` is called once per committed event, best-effort,
//! from `AuditEngine`. `LocalGzipArchiver` buffers staged events and
//! flushes a gzip-compressed JSON-lines batch to
//! `<base>/YYYY/MM/DD/batch-XXXX.jsonl.gz` once the buffer reaches
//! `batch_size`. Shipping the finished batch to an object store is out
//! of scope; this only produces the file and the naming convention.

use crate::error::{AuditError, AuditResult};
use crate::store::StoredEvent;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

pub trait Archiver: Send + Sync {
    /// Stage a committed event for archival. Must never block the caller
    /// on I/O failures that aren't worth surfacing past a log line.
    fn stage(&self, event: &StoredEvent) -> AuditResult<()>;
}

pub struct LocalGzipArchiver {
    base_dir: PathBuf,
    batch_size: usize,
    pending: Mutex<Vec<StoredEvent>>,
    batch_counter: AtomicU64,
}

impl LocalGzipArchiver {
    pub fn new(base_dir: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            base_dir: base_dir.into(),
            batch_size: batch_size.max(1),
            pending: Mutex::new(Vec::new()),
            batch_counter: AtomicU64::new(0),
        }
    }

    fn flush(&self, batch: Vec<StoredEvent>) -> AuditResult<PathBuf> {
        let first = batch
            .first()
            .ok_or_else(|| AuditError::InvalidInput("cannot flush an empty batch".to_string()))?;
        let day = first.event.ts;
        let dir = self
            .base_dir
            .join(day.format("%Y").to_string())
            .join(day.format("%m").to_string())
            .join(day.format("%d").to_string());
        fs::create_dir_all(&dir).map_err(|e| AuditError::Backend(e.to_string()))?;

        let index = self.batch_counter.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("batch-{index:04}.jsonl.gz"));
        let file = fs::File::create(&path).map_err(|e| AuditError::Backend(e.to_string()))?;
        let mut encoder = GzEncoder::new(file, Compression::default());

        for stored in &batch {
            let line = serde_json::to_vec(&stored.event).map_err(|e| AuditError::Backend(e.to_string()))?;
            encoder.write_all(&line).map_err(|e| AuditError::Backend(e.to_string()))?;
            encoder.write_all(b"\n").map_err(|e| AuditError::Backend(e.to_string()))?;
        }
        encoder.finish().map_err(|e| AuditError::Backend(e.to_string()))?;
        Ok(path)
    }
}

impl Archiver for LocalGzipArchiver {
    fn stage(&self, event: &StoredEvent) -> AuditResult<()> {
        let batch = {
            let mut pending = self
                .pending
                .lock()
                .map_err(|_| AuditError::Backend("archiver lock poisoned".to_string()))?;
            pending.push(event.clone());
            if pending.len() < self.batch_size {
                return Ok(());
            }
            std::mem::take(&mut *pending)
        };
        self.flush(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sentinel_types::{Actor, AuditEvent, EventId, JsonValue};

    fn stored(n: u64) -> StoredEvent {
        StoredEvent {
            event: AuditEvent {
                event_id: EventId::generate(),
                event_type: "test.event".to_string(),
                actor: Actor::new("tester"),
                ts: Utc::now(),
                payload: JsonValue::Null,
                prev_hash: None,
                hash: format!("hash-{n}"),
                signature: "sig".to_string(),
                signer_kid: "kid".to_string(),
                manifest_signature_id: None,
                retention_expires_at: None,
            },
            sequence: n,
        }
    }

    #[test]
    fn flushes_once_batch_size_reached() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = LocalGzipArchiver::new(dir.path(), 2);
        archiver.stage(&stored(1)).unwrap();
        assert_eq!(walk_files(dir.path()).len(), 0);
        archiver.stage(&stored(2)).unwrap();
        assert_eq!(walk_files(dir.path()).len(), 1);
    }

    fn walk_files(root: &std::path::Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else { continue };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    out.push(path);
                }
            }
        }
        out
    }
}
