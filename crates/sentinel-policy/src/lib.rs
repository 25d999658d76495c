//! Synchronous policy evaluation with canary rollout and multisig gating.
//!
//! A [`PolicyEngine`] holds the active policy set and evaluates a
//! [`sentinel_types::PolicyCheckRequest`] against every policy scoped to
//! the request's action, combining the results with deny-dominates-allow
//! semantics and recording the outcome through [`sentinel_audit`].

#![deny(unsafe_code)]

pub mod canary;
pub mod engine;
pub mod error;
pub mod rule;

pub use engine::PolicyEngine;
pub use error::{PolicyError, PolicyResult};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sentinel_types::{
        Policy, PolicyCheckRequest, PolicyId, PolicyMetadata, PolicyState, RuleExpr, Severity,
    };
    use std::collections::BTreeMap;

    fn deny_policy(action: &str) -> Policy {
        let mut rule = BTreeMap::new();
        rule.insert(
            "==".to_string(),
            sentinel_types::JsonValue::Array(vec![
                sentinel_types::JsonValue::Object({
                    let mut m = BTreeMap::new();
                    m.insert("var".to_string(), sentinel_types::JsonValue::String("action".to_string()));
                    m
                }),
                sentinel_types::JsonValue::String(action.to_string()),
            ]),
        );
        Policy {
            policy_id: PolicyId::new("deny-delete"),
            version: 1,
            name: "deny delete".to_string(),
            severity: Severity::Medium,
            rule: RuleExpr(sentinel_types::JsonValue::Object(rule)),
            metadata: PolicyMetadata {
                canary_percent: 0.0,
                fail_closed: false,
                scope: vec![action.to_string()],
            },
            state: PolicyState::Active,
            created_by: "tester".to_string(),
            created_at: Utc::now(),
            history_ref: None,
        }
    }

    #[tokio::test]
    async fn matching_rule_denies_the_action() {
        let engine = PolicyEngine::new();
        engine.add_policy(deny_policy("memory.delete")).unwrap();

        let request = PolicyCheckRequest {
            action: "memory.delete".to_string(),
            actor: "svc-a".to_string(),
            resource: sentinel_types::JsonValue::Null,
            context: sentinel_types::JsonValue::Null,
            request_id: None,
            simulate: true,
        };
        let decision = engine.check(&request).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.evidence_refs.len(), 1);
    }

    #[tokio::test]
    async fn no_matching_policy_allows_unconditionally() {
        let engine = PolicyEngine::new();
        let request = PolicyCheckRequest {
            action: "memory.read".to_string(),
            actor: "svc-a".to_string(),
            resource: sentinel_types::JsonValue::Null,
            context: sentinel_types::JsonValue::Null,
            request_id: None,
            simulate: true,
        };
        let decision = engine.check(&request).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.rule_id, "default-allow");
    }

    #[test]
    fn high_severity_requires_quorum_to_activate() {
        let engine = PolicyEngine::new();
        let mut policy = deny_policy("alloc.request");
        policy.severity = Severity::High;
        policy.state = PolicyState::Canary;
        engine.add_policy(policy).unwrap();

        let err = engine
            .transition(&PolicyId::new("deny-delete"), 1, PolicyState::Active, None)
            .unwrap_err();
        assert!(matches!(err, PolicyError::UpgradeRequired));
    }
}
