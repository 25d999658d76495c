//! The policy engine: rule evaluation, canary sampling, lifecycle state
//! machine, and the canary auto-rollback controller.

use crate::canary::is_sampled;
use crate::error::{PolicyError, PolicyResult};
use crate::rule;
use chrono::Utc;
use sentinel_audit::{AppendRequest, AuditEngine};
use sentinel_types::{
    Actor, DecisionId, EvidenceRef, Policy, PolicyCheckRequest, PolicyDecision, PolicyId,
    PolicyState, Severity,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::warn;

const DEFAULT_EVAL_TIMEOUT: Duration = Duration::from_millis(50);
const DEFAULT_ROLLBACK_WINDOW: Duration = Duration::from_secs(300);
const MAX_SIMULATE_EXAMPLES: usize = 20;

pub struct PolicyEngine {
    policies: RwLock<Vec<Policy>>,
    audit: Option<Arc<AuditEngine>>,
    eval_timeout: Duration,
    rollback: RollbackTracker,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(Vec::new()),
            audit: None,
            eval_timeout: DEFAULT_EVAL_TIMEOUT,
            rollback: RollbackTracker::new(DEFAULT_ROLLBACK_WINDOW),
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditEngine>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_eval_timeout(mut self, timeout: Duration) -> Self {
        self.eval_timeout = timeout;
        self
    }

    pub fn add_policy(&self, policy: Policy) -> PolicyResult<()> {
        let mut policies = self.lock_write()?;
        policies.push(policy);
        Ok(())
    }

    pub fn get_policy(&self, id: &PolicyId, version: u32) -> PolicyResult<Option<Policy>> {
        let policies = self.lock_read()?;
        Ok(policies
            .iter()
            .find(|p| &p.policy_id == id && p.version == version)
            .cloned())
    }

    fn lock_read(&self) -> PolicyResult<std::sync::RwLockReadGuard<'_, Vec<Policy>>> {
        self.policies
            .read()
            .map_err(|_| PolicyError::LockPoisoned("policies".to_string()))
    }

    fn lock_write(&self) -> PolicyResult<std::sync::RwLockWriteGuard<'_, Vec<Policy>>> {
        self.policies
            .write()
            .map_err(|_| PolicyError::LockPoisoned("policies".to_string()))
    }

    /// `check(request) -> decision`. Evaluates every `active`/`canary`
    /// policy scoped to `request.action`; `deny` dominates `allow`, the
    /// first `deny` (highest severity, then oldest policy) fills the
    /// rationale slot, and every evaluated policy contributes an
    /// `EvidenceRef`. Emits a `policy.decision` audit event unless
    /// `request.simulate` is set.
    pub async fn check(&self, request: &PolicyCheckRequest) -> PolicyResult<PolicyDecision> {
        let candidates: Vec<Policy> = {
            let policies = self.lock_read()?;
            policies
                .iter()
                .filter(|p| matches!(p.state, PolicyState::Active | PolicyState::Canary))
                .filter(|p| p.matches_action(&request.action))
                .cloned()
                .collect()
        };

        let mut context_map = std::collections::BTreeMap::new();
        context_map.insert("action".to_string(), sentinel_types::JsonValue::String(request.action.clone()));
        context_map.insert("actor".to_string(), sentinel_types::JsonValue::String(request.actor.clone()));
        context_map.insert("resource".to_string(), request.resource.clone());
        context_map.insert("context".to_string(), request.context.clone());
        let eval_context = sentinel_types::JsonValue::Object(context_map);

        let mut evidence = Vec::new();
        let mut deny_candidates: Vec<(Severity, chrono::DateTime<Utc>, &Policy)> = Vec::new();
        let mut is_canary_sampled = false;

        for policy in &candidates {
            if policy.state == PolicyState::Canary {
                let request_id = request
                    .request_id
                    .as_ref()
                    .map(|r| r.as_str().to_string())
                    .unwrap_or_default();
                let sampled = is_sampled(policy.policy_id.as_str(), &request_id, policy.metadata.canary_percent);
                if !sampled {
                    continue;
                }
                is_canary_sampled = true;
            }

            let rule_id = format!("{}@{}", policy.policy_id, policy.version);
            let (triggered, allowed) = match rule::evaluate(&policy.rule.0, &eval_context, self.eval_timeout) {
                Ok(triggered) => (triggered, !triggered),
                Err(err) => {
                    warn!(policy_id = %policy.policy_id, error = %err, "policy evaluation error");
                    if policy.metadata.fail_closed {
                        (true, false)
                    } else {
                        (false, true)
                    }
                }
            };

            evidence.push(EvidenceRef {
                policy_id: policy.policy_id.clone(),
                policy_version: policy.version,
                rule_id: rule_id.clone(),
                triggered,
                allowed,
            });

            if !allowed {
                deny_candidates.push((policy.severity, policy.created_at, policy));
            }
        }

        let ts = Utc::now();
        let decision = if let Some((_, _, winner)) = deny_candidates
            .iter()
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        {
            PolicyDecision {
                decision_id: DecisionId::generate(),
                policy_id: winner.policy_id.clone(),
                policy_version: winner.version,
                allowed: false,
                rule_id: format!("{}@{}", winner.policy_id, winner.version),
                rationale: format!("denied by policy {} ({})", winner.policy_id, winner.name),
                evidence_refs: evidence,
                request_id: request.request_id.clone(),
                ts,
                is_canary_sampled,
            }
        } else if let Some(first) = candidates.first() {
            PolicyDecision {
                decision_id: DecisionId::generate(),
                policy_id: first.policy_id.clone(),
                policy_version: first.version,
                allowed: true,
                rule_id: "no-deny".to_string(),
                rationale: "no policy denied the action".to_string(),
                evidence_refs: evidence,
                request_id: request.request_id.clone(),
                ts,
                is_canary_sampled,
            }
        } else {
            PolicyDecision::unconditional_allow(ts)
        };

        for policy in &candidates {
            if policy.state == PolicyState::Canary {
                self.rollback.record(&policy.policy_id, !decision.allowed);
            }
        }

        if !request.simulate {
            if let Some(audit) = &self.audit {
                let payload = sentinel_types::JsonValue::from_serde_json(
                    serde_json::to_value(&decision).map_err(|e| PolicyError::RuleParse(e.to_string()))?,
                );
                audit
                    .append(AppendRequest {
                        event_type: "policy.decision".to_string(),
                        actor: Actor::new(request.actor.clone()),
                        payload,
                        manifest_signature_id: None,
                        retention_expires_at: None,
                    })
                    .await?;
            }
        }

        Ok(decision)
    }

    /// Evaluate a policy against historical events without emitting any
    /// decision. Returns `(sampleSize, matched, matchRate, examples)`,
    /// where `examples` holds up to `MAX_SIMULATE_EXAMPLES` of the
    /// matching events for inspection.
    pub fn simulate(
        &self,
        policy_id: &PolicyId,
        version: u32,
        sample_events: &[sentinel_types::JsonValue],
    ) -> PolicyResult<(usize, usize, f64, Vec<sentinel_types::JsonValue>)> {
        let policy = self
            .get_policy(policy_id, version)?
            .ok_or_else(|| PolicyError::NotFound(policy_id.to_string()))?;

        let mut matched = 0;
        let mut examples = Vec::new();
        for event in sample_events {
            if rule::evaluate(&policy.rule.0, event, self.eval_timeout).unwrap_or(false) {
                matched += 1;
                if examples.len() < MAX_SIMULATE_EXAMPLES {
                    examples.push(event.clone());
                }
            }
        }
        let sample_size = sample_events.len();
        let match_rate = if sample_size == 0 { 0.0 } else { matched as f64 / sample_size as f64 };
        Ok((sample_size, matched, match_rate, examples))
    }

    /// Move a policy to a new lifecycle state. Transitions into `active`
    /// or out of `active` for HIGH/CRITICAL severity require a completed
    /// multi-signature upgrade (`quorum.has_quorum`).
    pub fn transition(
        &self,
        policy_id: &PolicyId,
        version: u32,
        to: PolicyState,
        quorum: Option<&sentinel_types::QuorumResult>,
    ) -> PolicyResult<()> {
        let mut policies = self.lock_write()?;
        let policy = policies
            .iter_mut()
            .find(|p| &p.policy_id == policy_id && p.version == version)
            .ok_or_else(|| PolicyError::NotFound(policy_id.to_string()))?;

        let from = policy.state;
        let requires_upgrade = policy.severity.requires_multisig()
            && (to == PolicyState::Active || from == PolicyState::Active);
        if requires_upgrade && !quorum.map(|q| q.has_quorum).unwrap_or(false) {
            return Err(PolicyError::UpgradeRequired);
        }
        if !is_valid_transition(from, to) {
            return Err(PolicyError::InvalidTransition { from, to });
        }

        policy.state = to;
        Ok(())
    }

    /// Called by the background canary-rollback controller: if a canary
    /// policy's denial rate over the rolling window exceeds `threshold`,
    /// revert it to `draft` and return `true`.
    pub fn check_rollback(&self, policy_id: &PolicyId, version: u32, threshold: f64) -> PolicyResult<bool> {
        let rate = self.rollback.denial_rate(policy_id);
        if rate <= threshold {
            return Ok(false);
        }
        self.transition(policy_id, version, PolicyState::Draft, None)?;
        self.rollback.reset(policy_id);
        Ok(true)
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_transition(from: PolicyState, to: PolicyState) -> bool {
    use PolicyState::*;
    matches!(
        (from, to),
        (Draft, Simulating)
            | (Simulating, Canary)
            | (Simulating, Draft)
            | (Canary, Active)
            | (Canary, Draft)
            | (Active, Deprecated)
            | (Active, Draft)
    )
}

struct RollbackTracker {
    window: Duration,
    outcomes: RwLock<HashMap<String, VecDeque<(Instant, bool)>>>,
}

impl RollbackTracker {
    fn new(window: Duration) -> Self {
        Self {
            window,
            outcomes: RwLock::new(HashMap::new()),
        }
    }

    fn record(&self, policy_id: &PolicyId, denied: bool) {
        let mut outcomes = self.outcomes.write().expect("rollback tracker lock poisoned");
        let entry = outcomes.entry(policy_id.to_string()).or_default();
        entry.push_back((Instant::now(), denied));
        let window = self.window;
        while let Some((ts, _)) = entry.front() {
            if ts.elapsed() > window {
                entry.pop_front();
            } else {
                break;
            }
        }
    }

    fn denial_rate(&self, policy_id: &PolicyId) -> f64 {
        let outcomes = self.outcomes.read().expect("rollback tracker lock poisoned");
        let Some(entry) = outcomes.get(&policy_id.to_string()) else {
            return 0.0;
        };
        if entry.is_empty() {
            return 0.0;
        }
        let denied = entry.iter().filter(|(_, d)| *d).count();
        denied as f64 / entry.len() as f64
    }

    fn reset(&self, policy_id: &PolicyId) {
        let mut outcomes = self.outcomes.write().expect("rollback tracker lock poisoned");
        outcomes.remove(&policy_id.to_string());
    }
}
