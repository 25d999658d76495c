//! Multi-signature quorum evaluation for high-severity policy transitions
//! and high-value allocations: 3-of-5 by default, one approval per
//! approver, drawn only from a pre-registered approver list.

use sentinel_types::{QuorumResult, Upgrade, UpgradeApproval};
use std::collections::HashSet;

pub fn evaluate_quorum(upgrade: &Upgrade, approvals: &[UpgradeApproval]) -> QuorumResult {
    let valid_approvers: HashSet<&str> = upgrade.approver_ids.iter().map(String::as_str).collect();

    let mut seen = HashSet::new();
    let mut invalid_approvers = Vec::new();

    for approval in approvals {
        if approval.upgrade_id.0 != upgrade.id.0 {
            continue;
        }
        if !valid_approvers.contains(approval.approver_id.as_str()) {
            invalid_approvers.push(approval.approver_id.clone());
            continue;
        }
        seen.insert(approval.approver_id.clone());
    }

    let unique_approvers = seen.len() as u32;
    let missing_approvals = upgrade.required_approvals.saturating_sub(unique_approvers);

    QuorumResult {
        has_quorum: unique_approvers >= upgrade.required_approvals,
        unique_approvers,
        missing_approvals,
        invalid_approvers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sentinel_types::{JsonValue, UpgradeId, UpgradeStatus};

    fn upgrade(required: u32, approvers: Vec<&str>) -> Upgrade {
        Upgrade {
            id: UpgradeId::new("up-1"),
            subject: "policy:deny-delete@2".to_string(),
            required_approvals: required,
            approver_ids: approvers.into_iter().map(String::from).collect(),
            status: UpgradeStatus::Pending,
            created_at: Utc::now(),
            metadata: JsonValue::Null,
        }
    }

    fn approval(approver: &str) -> UpgradeApproval {
        UpgradeApproval {
            upgrade_id: UpgradeId::new("up-1"),
            approver_id: approver.to_string(),
            ts: Utc::now(),
        }
    }

    #[test]
    fn reaches_quorum_with_three_of_five() {
        let upgrade = upgrade(3, vec!["a1", "a2", "a3", "a4", "a5"]);
        let approvals = vec![approval("a1"), approval("a2"), approval("a3")];
        let result = evaluate_quorum(&upgrade, &approvals);
        assert!(result.has_quorum);
        assert_eq!(result.unique_approvers, 3);
        assert_eq!(result.missing_approvals, 0);
    }

    #[test]
    fn duplicate_approvals_from_same_approver_count_once() {
        let upgrade = upgrade(3, vec!["a1", "a2", "a3"]);
        let approvals = vec![approval("a1"), approval("a1"), approval("a2")];
        let result = evaluate_quorum(&upgrade, &approvals);
        assert!(!result.has_quorum);
        assert_eq!(result.unique_approvers, 2);
        assert_eq!(result.missing_approvals, 1);
    }

    #[test]
    fn approvals_from_unregistered_approvers_are_flagged_invalid() {
        let upgrade = upgrade(2, vec!["a1", "a2"]);
        let approvals = vec![approval("a1"), approval("stranger")];
        let result = evaluate_quorum(&upgrade, &approvals);
        assert!(!result.has_quorum);
        assert_eq!(result.invalid_approvers, vec!["stranger".to_string()]);
    }
}
