//! Eval -> Promotion -> Allocation workflow types.

use crate::ids::{AllocationId, PromotionId, UpgradeId};
use crate::json::JsonValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionAction {
    Promote,
    Demote,
    Hold,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    Pending,
    Approved,
    Applied,
    Rejected,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Promotion {
    pub id: PromotionId,
    pub agent_id: String,
    pub action: PromotionAction,
    pub rationale: String,
    pub confidence: f64,
    pub status: PromotionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Pending,
    PendingFinance,
    PendingMultisig,
    Applied,
    Rejected,
}

impl AllocationStatus {
    /// Terminal statuses admit no subsequent state change.
    pub fn is_terminal(self) -> bool {
        matches!(self, AllocationStatus::Applied | AllocationStatus::Rejected)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub id: AllocationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<PromotionId>,
    pub entity_id: String,
    pub pool: String,
    pub delta: f64,
    pub reason: String,
    pub status: AllocationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentinel_decision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A Finance-signed record of a balanced set of ledger lines covering an
/// allocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settlement {
    pub allocation_id: AllocationId,
    pub ledger_lines: Vec<LedgerLine>,
    pub signature: String,
    pub signer_kid: String,
    pub ts: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerLine {
    pub account: String,
    pub amount: f64,
}

impl Settlement {
    /// Debits must equal credits (sum to zero with signed amounts).
    pub fn is_balanced(&self) -> bool {
        let sum: f64 = self.ledger_lines.iter().map(|l| l.amount).sum();
        sum.abs() < 1e-9
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeStatus {
    Pending,
    Applied,
    Rejected,
}

/// A multi-signature upgrade request gating a HIGH/CRITICAL policy
/// transition or a high-value allocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Upgrade {
    pub id: UpgradeId,
    pub subject: String,
    pub required_approvals: u32,
    pub approver_ids: Vec<String>,
    pub status: UpgradeStatus,
    pub created_at: DateTime<Utc>,
    pub metadata: JsonValue,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpgradeApproval {
    pub upgrade_id: UpgradeId,
    pub approver_id: String,
    pub ts: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuorumResult {
    pub has_quorum: bool,
    pub unique_approvers: u32,
    pub missing_approvals: u32,
    pub invalid_approvers: Vec<String>,
}

/// Normalized eval-report score with component breakdown.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvalScore {
    pub agent_id: String,
    pub score: f64,
    pub components: Vec<(String, f64)>,
    pub confidence: f64,
    pub window: u32,
}
