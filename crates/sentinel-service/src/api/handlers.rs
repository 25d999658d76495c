//! Request handlers for the governance HTTP surface.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use sentinel_audit::QueryWindow;
use sentinel_kernel::GatedWriteOutcome;
use sentinel_types::{
    AllocationRequest, EvalScore, JsonValue, MemoryNodeId, Policy, PolicyCheckRequest,
    PolicyState, RequestId, Settlement, Upgrade, UpgradeApproval,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: String,
    uptime_seconds: i64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// `POST /sentinelnet/check`: evaluates a proposed action against every
/// active/canary policy and returns the combined decision.
pub async fn policy_check(
    State(state): State<AppState>,
    Json(request): Json<PolicyCheckRequest>,
) -> ApiResult<Json<Value>> {
    let decision = state.policy.check(&request).await?;
    Ok(Json(serde_json::to_value(decision).map_err(|e| ApiError::BadRequest(e.to_string()))?))
}

/// `POST /sentinelnet/policy`: registers a new policy version in `draft`.
pub async fn create_policy(
    State(state): State<AppState>,
    Json(policy): Json<Policy>,
) -> ApiResult<Json<Value>> {
    state.policy.add_policy(policy.clone())?;
    Ok(Json(json!({ "policyId": policy.policy_id, "version": policy.version, "state": policy.state })))
}

#[derive(Deserialize)]
pub struct ExplainRequest {
    #[serde(default)]
    pub sample_events: Vec<JsonValue>,
}

/// `POST /sentinelnet/policy/:id/:version/explain`: dry-runs a policy
/// version over sample events without emitting an audit decision.
pub async fn explain_policy(
    State(state): State<AppState>,
    Path((policy_id, version)): Path<(String, u32)>,
    Json(request): Json<ExplainRequest>,
) -> ApiResult<Json<Value>> {
    let id = sentinel_types::PolicyId::new(policy_id);
    let (sample_size, matched, match_rate, examples) =
        state.policy.simulate(&id, version, &request.sample_events)?;
    Ok(Json(json!({
        "policyId": id,
        "version": version,
        "sampleSize": sample_size,
        "matchedEvents": matched,
        "matchRate": match_rate,
        "examples": examples,
    })))
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub to: PolicyState,
    #[serde(default)]
    pub quorum: Option<sentinel_types::QuorumResult>,
}

/// `POST /sentinelnet/policy/:id/:version/transition`: moves a policy
/// through its lifecycle, gated by multisig quorum for high/critical
/// severities.
pub async fn transition_policy(
    State(state): State<AppState>,
    Path((policy_id, version)): Path<(String, u32)>,
    Json(request): Json<TransitionRequest>,
) -> ApiResult<Json<Value>> {
    let id = sentinel_types::PolicyId::new(policy_id);
    state.policy.transition(&id, version, request.to, request.quorum.as_ref())?;
    Ok(Json(json!({ "policyId": id, "version": version, "state": request.to })))
}

#[derive(Serialize)]
pub struct GatedWriteResponse {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<sentinel_types::PolicyDecision>,
}

impl From<GatedWriteOutcome> for GatedWriteResponse {
    fn from(outcome: GatedWriteOutcome) -> Self {
        match outcome {
            GatedWriteOutcome::Applied { result, decision } => Self {
                outcome: "applied",
                result: Some(result),
                decision: Some(decision),
            },
            GatedWriteOutcome::Denied { decision } => Self {
                outcome: "denied",
                result: None,
                decision: Some(decision),
            },
            GatedWriteOutcome::Replayed { result } => Self {
                outcome: "replayed",
                result: Some(result),
                decision: None,
            },
        }
    }
}

#[derive(Deserialize)]
pub struct CreateMemoryNodeRequest {
    pub node: sentinel_types::MemoryNodeInput,
    pub actor: String,
    pub idempotency_key: String,
    #[serde(default)]
    pub request_id: Option<RequestId>,
    #[serde(default)]
    pub inherited_manifest_signature_id: Option<String>,
}

/// `POST /memory/nodes`: `createMemoryNode` under the gated-write
/// envelope (policy check, atomic domain write, audit append).
pub async fn create_memory_node(
    State(state): State<AppState>,
    Json(request): Json<CreateMemoryNodeRequest>,
) -> ApiResult<Json<GatedWriteResponse>> {
    let outcome = state
        .memory
        .create_memory_node(
            request.node,
            request.actor,
            request.idempotency_key,
            request.request_id,
            request.inherited_manifest_signature_id,
        )
        .await?;
    Ok(Json(outcome.into()))
}

#[derive(Deserialize)]
pub struct GetNodeQuery {
    #[serde(default)]
    pub read_pii: bool,
}

/// `GET /memory/nodes/:id`: redacts PII fields unless the caller asserts
/// `read_pii` (stand-in for a `read:pii` capability check upstream).
pub async fn get_memory_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<GetNodeQuery>,
) -> ApiResult<Json<sentinel_types::MemoryNode>> {
    let node_id = MemoryNodeId::new(id);
    let node = state
        .memory
        .get_node(&node_id, query.read_pii)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(node))
}

#[derive(Deserialize)]
pub struct LegalHoldRequest {
    pub legal_hold: bool,
}

pub async fn set_legal_hold(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<LegalHoldRequest>,
) -> ApiResult<Json<sentinel_types::MemoryNode>> {
    let node_id = MemoryNodeId::new(id);
    let node = state.memory.set_legal_hold(&node_id, request.legal_hold).await?;
    Ok(Json(node))
}

/// `POST /eval/submit`: records one eval-window score; fires a
/// `Promotion` exactly on the window the N-window hysteresis streak
/// completes.
pub async fn submit_eval(
    State(state): State<AppState>,
    Json(score): Json<EvalScore>,
) -> Json<Value> {
    let promotion = state.promotion.record(&score);
    Json(json!({ "promotion": promotion }))
}

/// `POST /eval/roi`: records a post-apply ROI sample; fires a `Demote`
/// promotion once the rolling window's average turns negative.
#[derive(Deserialize)]
pub struct RoiSample {
    pub agent_id: String,
    pub roi: f64,
}

pub async fn submit_roi(State(state): State<AppState>, Json(sample): Json<RoiSample>) -> Json<Value> {
    let demotion = state.roi.record(&sample.agent_id, sample.roi);
    Json(json!({ "demotion": demotion }))
}

#[derive(Deserialize)]
pub struct RequestAllocationRequest {
    pub request: AllocationRequest,
    pub actor: String,
}

pub async fn request_allocation(
    State(state): State<AppState>,
    Json(body): Json<RequestAllocationRequest>,
) -> ApiResult<Json<AllocationRequest>> {
    let allocation = state.allocation.request_allocation(body.request, &body.actor).await?;
    Ok(Json(allocation))
}

#[derive(Deserialize)]
pub struct SettleAllocationRequest {
    pub settlement: Settlement,
    pub actor: String,
}

pub async fn settle_allocation(
    State(state): State<AppState>,
    Json(body): Json<SettleAllocationRequest>,
) -> ApiResult<Json<AllocationRequest>> {
    let allocation = state.allocation.apply_settlement(body.settlement, &body.actor).await?;
    Ok(Json(allocation))
}

#[derive(Deserialize)]
pub struct ApproveAllocationRequest {
    pub allocation_id: sentinel_types::AllocationId,
    pub upgrade: Upgrade,
    pub approvals: Vec<UpgradeApproval>,
    pub actor: String,
}

pub async fn approve_allocation(
    State(state): State<AppState>,
    Json(body): Json<ApproveAllocationRequest>,
) -> ApiResult<Json<AllocationRequest>> {
    let allocation = state
        .allocation
        .apply_quorum(&body.allocation_id, &body.upgrade, &body.approvals, &body.actor)
        .await?;
    Ok(Json(allocation))
}

pub async fn get_allocation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AllocationRequest>> {
    let allocation = state.allocation.get(&sentinel_types::AllocationId::new(id))?;
    Ok(Json(allocation))
}

/// `GET /kernel/audit`: paged read over the hash-chained audit log,
/// newest-first.
pub async fn list_audit(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let window = QueryWindow {
        limit: query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(50),
        offset: query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0),
    };
    let events = state.audit.store().list(window).await?;
    Ok(Json(serde_json::to_value(events).map_err(|e| ApiError::BadRequest(e.to_string()))?))
}
