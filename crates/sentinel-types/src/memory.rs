//! Memory-layer types: `MemoryNode`, `MemoryVector`, and their inputs.

use crate::ids::{ArtifactId, MemoryNodeId, MemoryVectorId};
use crate::json::JsonValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryNode {
    pub id: MemoryNodeId,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_id: Option<MemoryVectorId>,
    pub metadata: JsonValue,
    /// Flags describing which fields carry PII; read endpoints redact
    /// these when the caller lacks `read:pii`.
    pub pii_flags: BTreeMap<String, bool>,
    pub legal_hold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemoryNode {
    /// Legal hold blocks TTL expiry and explicit deletion.
    pub fn is_deletable(&self) -> bool {
        !self.legal_hold
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorStatus {
    Pending,
    Completed,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryVector {
    pub id: MemoryVectorId,
    pub memory_node_id: MemoryNodeId,
    pub provider: String,
    pub namespace: String,
    pub embedding_model: String,
    pub dimension: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_vector_id: Option<String>,
    pub status: VectorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub vector_data: Vec<f32>,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub memory_node_id: MemoryNodeId,
    pub artifact_url: String,
    pub sha256: String,
    pub manifest_signature_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningGraphJobStatus {
    Pending,
    Completed,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReasoningGraphJob {
    pub memory_node_id: MemoryNodeId,
    pub status: ReasoningGraphJobStatus,
    pub created_at: DateTime<Utc>,
}

/// Input to `createMemoryNode`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryNodeInput {
    pub owner: String,
    #[serde(default)]
    pub metadata: JsonValue,
    #[serde(default)]
    pub pii_flags: BTreeMap<String, bool>,
    #[serde(default)]
    pub legal_hold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingInput>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactInput>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingInput {
    pub model: String,
    pub dimension: u32,
    pub namespace: String,
    pub provider: String,
    pub vector: Vec<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactInput {
    pub artifact_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_signature_id: Option<String>,
    /// Raw content to be stream-hashed by the ingest path, when the
    /// service (rather than a pre-hashed mTLS peer) is the source of the
    /// artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
}
