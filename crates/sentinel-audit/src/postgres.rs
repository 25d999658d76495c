//! PostgreSQL adapter for the audit chain.
//!
//! Postgres is the transactional source of truth: `append_audit` takes an
//! exclusive lock on the event table for the duration of the transaction,
//! reads the current head, hashes and signs the new row, and commits. The
//! lock is what serializes concurrent appends into one chain.

use crate::error::{classify_sqlx_error, AuditError, AuditResult};
use crate::hashing::{compute_hash, finish_event};
use crate::store::{AppendRequest, AuditStore, QueryWindow, StoredEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinel_crypto::Signer;
use sentinel_types::{Actor, AuditEvent, EventId, JsonValue};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;

#[derive(Clone)]
pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    pub async fn connect(database_url: &str) -> AuditResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> AuditResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| AuditError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn from_pool(pool: PgPool) -> AuditResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> AuditResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sentinel_audit_events (
                event_id TEXT PRIMARY KEY,
                sequence BIGINT NOT NULL UNIQUE,
                event_type TEXT NOT NULL,
                actor TEXT NOT NULL,
                ts TIMESTAMPTZ NOT NULL,
                payload JSONB NOT NULL,
                prev_hash TEXT,
                hash TEXT NOT NULL UNIQUE,
                signature TEXT NOT NULL,
                signer_kid TEXT NOT NULL,
                manifest_signature_id TEXT,
                retention_expires_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS sentinel_audit_events_hash_idx ON sentinel_audit_events (hash)",
        )
        .execute(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        Ok(())
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn append_audit(&self, request: AppendRequest, signer: &Signer) -> AuditResult<StoredEvent> {
        let mut tx = self.pool.begin().await.map_err(classify_sqlx_error)?;

        sqlx::query("LOCK TABLE sentinel_audit_events IN EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(classify_sqlx_error)?;

        let head = sqlx::query(
            "SELECT sequence, hash FROM sentinel_audit_events ORDER BY sequence DESC LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify_sqlx_error)?;

        let (sequence, prev_hash) = match head {
            Some(row) => {
                let seq: i64 = row.try_get("sequence").map_err(classify_sqlx_error)?;
                let hash: String = row.try_get("hash").map_err(classify_sqlx_error)?;
                (seq + 1, Some(hash))
            }
            None => (1_i64, None),
        };

        let ts = Utc::now();
        let event_id = EventId::generate();
        let hash_bytes = compute_hash(
            event_id.as_str(),
            &request.event_type,
            &request.actor,
            ts,
            &request.payload,
            &prev_hash,
            &request.manifest_signature_id,
            &request.retention_expires_at,
        )?;
        let hash_hex = hex::encode(hash_bytes);

        if let Some(existing) = self.get_by_hash(&hash_hex).await? {
            tx.commit().await.map_err(classify_sqlx_error)?;
            return Ok(existing);
        }

        let (signature, signer_kid) = signer
            .sign(&hash_bytes)
            .await
            .map_err(|e| AuditError::SigningFailure(e.to_string()))?;

        let event = finish_event(
            event_id.0.clone(),
            request.event_type,
            request.actor,
            ts,
            request.payload,
            prev_hash.clone(),
            hash_hex.clone(),
            signature,
            signer_kid,
            request.manifest_signature_id,
            request.retention_expires_at,
        );

        sqlx::query(
            r#"
            INSERT INTO sentinel_audit_events
                (event_id, sequence, event_type, actor, ts, payload, prev_hash, hash, signature, signer_kid, manifest_signature_id, retention_expires_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(event.event_id.as_str())
        .bind(sequence)
        .bind(&event.event_type)
        .bind(&event.actor.0)
        .bind(event.ts)
        .bind(event.payload.to_serde_json())
        .bind(&event.prev_hash)
        .bind(&event.hash)
        .bind(&event.signature)
        .bind(&event.signer_kid)
        .bind(&event.manifest_signature_id)
        .bind(event.retention_expires_at)
        .execute(&mut *tx)
        .await
        .map_err(classify_sqlx_error)?;

        tx.commit().await.map_err(classify_sqlx_error)?;

        Ok(StoredEvent {
            event,
            sequence: sequence as u64,
        })
    }

    async fn get_by_hash(&self, hash: &str) -> AuditResult<Option<StoredEvent>> {
        let row = sqlx::query(
            r#"SELECT event_id, sequence, event_type, actor, ts, payload, prev_hash, hash, signature, signer_kid, manifest_signature_id, retention_expires_at
               FROM sentinel_audit_events WHERE hash = $1"#,
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;
        row.map(row_to_stored).transpose()
    }

    async fn get_by_id(&self, event_id: &str) -> AuditResult<Option<StoredEvent>> {
        let row = sqlx::query(
            r#"SELECT event_id, sequence, event_type, actor, ts, payload, prev_hash, hash, signature, signer_kid, manifest_signature_id, retention_expires_at
               FROM sentinel_audit_events WHERE event_id = $1"#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;
        row.map(row_to_stored).transpose()
    }

    async fn list(&self, window: QueryWindow) -> AuditResult<Vec<StoredEvent>> {
        let limit = if window.limit == 0 { i64::MAX } else { window.limit as i64 };
        let rows = sqlx::query(
            r#"SELECT event_id, sequence, event_type, actor, ts, payload, prev_hash, hash, signature, signer_kid, manifest_signature_id, retention_expires_at
               FROM sentinel_audit_events ORDER BY sequence DESC LIMIT $1 OFFSET $2"#,
        )
        .bind(limit)
        .bind(window.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;
        rows.into_iter().map(row_to_stored).collect()
    }

    async fn list_all_ordered(&self) -> AuditResult<Vec<StoredEvent>> {
        let rows = sqlx::query(
            r#"SELECT event_id, sequence, event_type, actor, ts, payload, prev_hash, hash, signature, signer_kid, manifest_signature_id, retention_expires_at
               FROM sentinel_audit_events ORDER BY sequence ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;
        rows.into_iter().map(row_to_stored).collect()
    }
}

fn row_to_stored(row: sqlx::postgres::PgRow) -> AuditResult<StoredEvent> {
    let sequence: i64 = row.try_get("sequence").map_err(classify_sqlx_error)?;
    let payload: serde_json::Value = row.try_get("payload").map_err(classify_sqlx_error)?;
    let event = AuditEvent {
        event_id: EventId(row.try_get("event_id").map_err(classify_sqlx_error)?),
        event_type: row.try_get("event_type").map_err(classify_sqlx_error)?,
        actor: Actor(row.try_get("actor").map_err(classify_sqlx_error)?),
        ts: row
            .try_get::<DateTime<Utc>, _>("ts")
            .map_err(classify_sqlx_error)?,
        payload: JsonValue::from_serde_json(payload),
        prev_hash: row.try_get("prev_hash").map_err(classify_sqlx_error)?,
        hash: row.try_get("hash").map_err(classify_sqlx_error)?,
        signature: row.try_get("signature").map_err(classify_sqlx_error)?,
        signer_kid: row.try_get("signer_kid").map_err(classify_sqlx_error)?,
        manifest_signature_id: row
            .try_get("manifest_signature_id")
            .map_err(classify_sqlx_error)?,
        retention_expires_at: row
            .try_get("retention_expires_at")
            .map_err(classify_sqlx_error)?,
    };
    Ok(StoredEvent {
        event,
        sequence: sequence as u64,
    })
}
