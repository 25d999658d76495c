//! Policy and policy-decision types.

use crate::ids::{DecisionId, PolicyId, RequestId};
use crate::json::JsonValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Severities that require a completed multi-signature upgrade record
    /// before a policy may transition into `active` or out of it.
    pub fn requires_multisig(self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyState {
    Draft,
    Simulating,
    Canary,
    Active,
    Deprecated,
}

/// A declarative rule expression, JSONLogic-shaped. `sentinel-policy` owns
/// the evaluator; this crate only owns the wire representation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleExpr(pub JsonValue);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyMetadata {
    #[serde(default)]
    pub canary_percent: f64,
    /// If true, evaluation timeout/parse errors deny rather than allow.
    #[serde(default)]
    pub fail_closed: bool,
    /// The dotted action name(s) this policy applies to.
    #[serde(default)]
    pub scope: Vec<String>,
}

impl Default for PolicyMetadata {
    fn default() -> Self {
        Self {
            canary_percent: 0.0,
            fail_closed: false,
            scope: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Policy {
    pub policy_id: PolicyId,
    pub version: u32,
    pub name: String,
    pub severity: Severity,
    pub rule: RuleExpr,
    pub metadata: PolicyMetadata,
    pub state: PolicyState,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_ref: Option<String>,
}

impl Policy {
    /// Composite uniqueness key: at most one row per `(policyId, version)`
    /// in the active set.
    pub fn key(&self) -> (PolicyId, u32) {
        (self.policy_id.clone(), self.version)
    }

    pub fn matches_action(&self, action: &str) -> bool {
        self.metadata.scope.is_empty()
            || self
                .metadata
                .scope
                .iter()
                .any(|scoped| scoped == action || scoped == "*")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyCheckRequest {
    pub action: String,
    pub actor: String,
    pub resource: JsonValue,
    pub context: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(default)]
    pub simulate: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub policy_id: PolicyId,
    pub policy_version: u32,
    pub rule_id: String,
    pub triggered: bool,
    pub allowed: bool,
}

/// A `policy.decision` emitted by the engine; the engine itself does not
/// persist these — they flow through `sentinel-audit`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub decision_id: DecisionId,
    pub policy_id: PolicyId,
    pub policy_version: u32,
    pub allowed: bool,
    pub rule_id: String,
    pub rationale: String,
    pub evidence_refs: Vec<EvidenceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    pub ts: DateTime<Utc>,
    pub is_canary_sampled: bool,
}

impl PolicyDecision {
    /// An allow-by-default decision for requests matched by zero policies.
    pub fn unconditional_allow(ts: DateTime<Utc>) -> Self {
        Self {
            decision_id: DecisionId::generate(),
            policy_id: PolicyId::new("none"),
            policy_version: 0,
            allowed: true,
            rule_id: "default-allow".to_string(),
            rationale: "no matching policy".to_string(),
            evidence_refs: Vec::new(),
            request_id: None,
            ts,
            is_canary_sampled: false,
        }
    }
}
