//! PostgreSQL adapter for the memory store.
//!
//! `create_node` binds the node row, an optional pending vector row, any
//! artifacts, and a pending reasoning-graph queue row in one transaction;
//! `(memory_node_id, namespace)` is enforced unique at the schema level so
//! a duplicate vector upsert aborts the whole insert.

use crate::artifact::resolve_artifact;
use crate::error::{MemoryError, MemoryResult};
use crate::store::{CreatedNode, MemoryStore};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use sentinel_types::{
    Artifact, ArtifactId, JsonValue, MemoryNode, MemoryNodeId, MemoryNodeInput, MemoryVector,
    MemoryVectorId, ReasoningGraphJob, ReasoningGraphJobStatus, VectorStatus,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;

fn classify(err: sqlx::Error) -> MemoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return MemoryError::DuplicateVector("unique constraint violated".to_string());
        }
    }
    MemoryError::Backend(err.to_string())
}

#[derive(Clone)]
pub struct PostgresMemoryStore {
    pool: PgPool,
}

impl PostgresMemoryStore {
    pub async fn connect(database_url: &str) -> MemoryResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(classify)?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn from_pool(pool: PgPool) -> MemoryResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> MemoryResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memory_nodes (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                embedding_id TEXT,
                metadata JSONB NOT NULL,
                pii_flags JSONB NOT NULL,
                legal_hold BOOLEAN NOT NULL,
                ttl_seconds BIGINT,
                expires_at TIMESTAMPTZ,
                deleted_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memory_vectors (
                id TEXT PRIMARY KEY,
                memory_node_id TEXT NOT NULL REFERENCES memory_nodes(id),
                provider TEXT NOT NULL,
                namespace TEXT NOT NULL,
                embedding_model TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                external_vector_id TEXT,
                status TEXT NOT NULL,
                error TEXT,
                vector_data JSONB NOT NULL,
                metadata JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                UNIQUE (memory_node_id, namespace)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS artifacts (
                id TEXT PRIMARY KEY,
                memory_node_id TEXT NOT NULL REFERENCES memory_nodes(id),
                artifact_url TEXT NOT NULL,
                sha256 TEXT NOT NULL,
                manifest_signature_id TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                UNIQUE (artifact_url, sha256)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reasoning_graph_queue (
                memory_node_id TEXT PRIMARY KEY REFERENCES memory_nodes(id),
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(())
    }
}

#[async_trait]
impl MemoryStore for PostgresMemoryStore {
    async fn create_node(
        &self,
        input: MemoryNodeInput,
        inherited_manifest_signature_id: Option<String>,
    ) -> MemoryResult<CreatedNode> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let now = Utc::now();
        let expires_at = input.ttl_seconds.map(|secs| now + ChronoDuration::seconds(secs));
        let node_id = MemoryNodeId::generate();

        sqlx::query(
            r#"INSERT INTO memory_nodes
               (id, owner, embedding_id, metadata, pii_flags, legal_hold, ttl_seconds, expires_at, deleted_at, created_at, updated_at)
               VALUES ($1, $2, NULL, $3, $4, $5, $6, $7, NULL, $8, $9)"#,
        )
        .bind(node_id.as_str())
        .bind(&input.owner)
        .bind(input.metadata.to_serde_json())
        .bind(serde_json::to_value(&input.pii_flags).map_err(|e| MemoryError::Backend(e.to_string()))?)
        .bind(input.legal_hold)
        .bind(input.ttl_seconds)
        .bind(expires_at)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;

        let vector = if let Some(embedding) = input.embedding {
            let vector_id = MemoryVectorId::generate();
            let vector_data = JsonValue::from_serde_json(serde_json::json!(embedding.vector));
            sqlx::query(
                r#"INSERT INTO memory_vectors
                   (id, memory_node_id, provider, namespace, embedding_model, dimension, external_vector_id, status, error, vector_data, metadata, created_at)
                   VALUES ($1, $2, $3, $4, $5, $6, NULL, 'pending', NULL, $7, $8, $9)"#,
            )
            .bind(vector_id.as_str())
            .bind(node_id.as_str())
            .bind(&embedding.provider)
            .bind(&embedding.namespace)
            .bind(&embedding.model)
            .bind(embedding.dimension as i32)
            .bind(vector_data.to_serde_json())
            .bind(JsonValue::Null.to_serde_json())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

            Some(MemoryVector {
                id: vector_id,
                memory_node_id: node_id.clone(),
                provider: embedding.provider,
                namespace: embedding.namespace,
                embedding_model: embedding.model,
                dimension: embedding.dimension,
                external_vector_id: None,
                status: VectorStatus::Pending,
                error: None,
                vector_data: embedding.vector,
                metadata: JsonValue::Null,
                created_at: now,
            })
        } else {
            None
        };

        let mut artifacts = Vec::new();
        for artifact_input in &input.artifacts {
            let (sha256, manifest_signature_id) =
                resolve_artifact(artifact_input, inherited_manifest_signature_id.as_deref())?;
            let artifact_id = ArtifactId::generate();
            let inserted = sqlx::query(
                r#"INSERT INTO artifacts (id, memory_node_id, artifact_url, sha256, manifest_signature_id, created_at)
                   VALUES ($1, $2, $3, $4, $5, $6)
                   ON CONFLICT (artifact_url, sha256) DO NOTHING"#,
            )
            .bind(artifact_id.as_str())
            .bind(node_id.as_str())
            .bind(&artifact_input.artifact_url)
            .bind(&sha256)
            .bind(&manifest_signature_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

            if inserted.rows_affected() > 0 {
                artifacts.push(Artifact {
                    id: artifact_id,
                    memory_node_id: node_id.clone(),
                    artifact_url: artifact_input.artifact_url.clone(),
                    sha256,
                    manifest_signature_id,
                    created_at: now,
                });
            }
        }

        sqlx::query(
            "INSERT INTO reasoning_graph_queue (memory_node_id, status, created_at) VALUES ($1, 'pending', $2)",
        )
        .bind(node_id.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;

        tx.commit().await.map_err(classify)?;

        let node = MemoryNode {
            id: node_id,
            owner: input.owner,
            embedding_id: vector.as_ref().map(|v| v.id.clone()),
            metadata: input.metadata,
            pii_flags: input.pii_flags,
            legal_hold: input.legal_hold,
            ttl_seconds: input.ttl_seconds,
            expires_at,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        Ok(CreatedNode { node, vector, artifacts })
    }

    async fn get_node(&self, id: &MemoryNodeId) -> MemoryResult<Option<MemoryNode>> {
        let row = sqlx::query(
            r#"SELECT id, owner, embedding_id, metadata, pii_flags, legal_hold, ttl_seconds, expires_at, deleted_at, created_at, updated_at
               FROM memory_nodes WHERE id = $1"#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;
        row.map(row_to_node).transpose()
    }

    async fn set_legal_hold(&self, id: &MemoryNodeId, legal_hold: bool) -> MemoryResult<MemoryNode> {
        let now = Utc::now();
        sqlx::query("UPDATE memory_nodes SET legal_hold = $1, updated_at = $2 WHERE id = $3")
            .bind(legal_hold)
            .bind(now)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        self.get_node(id)
            .await?
            .ok_or_else(|| MemoryError::NodeNotFound(id.clone()))
    }

    async fn claim_pending_vectors(&self, batch_size: usize) -> MemoryResult<Vec<MemoryVector>> {
        let rows = sqlx::query(
            r#"SELECT id, memory_node_id, provider, namespace, embedding_model, dimension, external_vector_id, status, error, vector_data, metadata, created_at
               FROM memory_vectors WHERE status != 'completed'
               ORDER BY created_at ASC LIMIT $1
               FOR UPDATE SKIP LOCKED"#,
        )
        .bind(batch_size as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;
        rows.into_iter().map(row_to_vector).collect()
    }

    async fn complete_vector(&self, id: &MemoryVectorId, external_vector_id: String) -> MemoryResult<()> {
        sqlx::query(
            "UPDATE memory_vectors SET status = 'completed', external_vector_id = $1, error = NULL WHERE id = $2",
        )
        .bind(external_vector_id)
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn fail_vector(&self, id: &MemoryVectorId, error: String) -> MemoryResult<()> {
        sqlx::query("UPDATE memory_vectors SET status = 'error', error = $1 WHERE id = $2")
            .bind(error)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn queue_depth(&self, namespace: &str) -> MemoryResult<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS depth FROM memory_vectors WHERE namespace = $1 AND status != 'completed'",
        )
        .bind(namespace)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;
        let depth: i64 = row.try_get("depth").map_err(classify)?;
        Ok(depth as u64)
    }

    async fn pending_reasoning_jobs(&self) -> MemoryResult<Vec<ReasoningGraphJob>> {
        let rows = sqlx::query(
            "SELECT memory_node_id, status, created_at FROM reasoning_graph_queue WHERE status = 'pending'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;
        rows.into_iter()
            .map(|row| {
                let memory_node_id: String = row.try_get("memory_node_id").map_err(classify)?;
                let created_at = row.try_get("created_at").map_err(classify)?;
                Ok(ReasoningGraphJob {
                    memory_node_id: MemoryNodeId(memory_node_id),
                    status: ReasoningGraphJobStatus::Pending,
                    created_at,
                })
            })
            .collect()
    }
}

fn row_to_node(row: sqlx::postgres::PgRow) -> MemoryResult<MemoryNode> {
    let id: String = row.try_get("id").map_err(classify)?;
    let embedding_id: Option<String> = row.try_get("embedding_id").map_err(classify)?;
    let metadata_json: serde_json::Value = row.try_get("metadata").map_err(classify)?;
    let pii_flags_json: serde_json::Value = row.try_get("pii_flags").map_err(classify)?;

    Ok(MemoryNode {
        id: MemoryNodeId(id),
        owner: row.try_get("owner").map_err(classify)?,
        embedding_id: embedding_id.map(MemoryVectorId),
        metadata: JsonValue::from_serde_json(metadata_json),
        pii_flags: serde_json::from_value(pii_flags_json).map_err(|e| MemoryError::Backend(e.to_string()))?,
        legal_hold: row.try_get("legal_hold").map_err(classify)?,
        ttl_seconds: row.try_get("ttl_seconds").map_err(classify)?,
        expires_at: row.try_get("expires_at").map_err(classify)?,
        deleted_at: row.try_get("deleted_at").map_err(classify)?,
        created_at: row.try_get("created_at").map_err(classify)?,
        updated_at: row.try_get("updated_at").map_err(classify)?,
    })
}

fn row_to_vector(row: sqlx::postgres::PgRow) -> MemoryResult<MemoryVector> {
    let status_str: String = row.try_get("status").map_err(classify)?;
    let status = match status_str.as_str() {
        "pending" => VectorStatus::Pending,
        "completed" => VectorStatus::Completed,
        _ => VectorStatus::Error,
    };
    let vector_data_json: serde_json::Value = row.try_get("vector_data").map_err(classify)?;
    let vector_data: Vec<f32> =
        serde_json::from_value(vector_data_json).map_err(|e| MemoryError::Backend(e.to_string()))?;
    let metadata_json: serde_json::Value = row.try_get("metadata").map_err(classify)?;
    let memory_node_id: String = row.try_get("memory_node_id").map_err(classify)?;
    let id: String = row.try_get("id").map_err(classify)?;
    let dimension: i32 = row.try_get("dimension").map_err(classify)?;

    Ok(MemoryVector {
        id: MemoryVectorId(id),
        memory_node_id: MemoryNodeId(memory_node_id),
        provider: row.try_get("provider").map_err(classify)?,
        namespace: row.try_get("namespace").map_err(classify)?,
        embedding_model: row.try_get("embedding_model").map_err(classify)?,
        dimension: dimension as u32,
        external_vector_id: row.try_get("external_vector_id").map_err(classify)?,
        status,
        error: row.try_get("error").map_err(classify)?,
        vector_data,
        metadata: JsonValue::from_serde_json(metadata_json),
        created_at: row.try_get("created_at").map_err(classify)?,
    })
}
