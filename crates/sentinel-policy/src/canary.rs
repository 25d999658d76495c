//! Deterministic canary sampling: a request either participates in a
//! canary policy's evaluation or it doesn't, based on a stable hash of
//! `(policyId, requestId)` rather than a random draw, so repeated checks
//! of the same request against the same policy agree.

use sha2::{Digest, Sha256};

/// `true` iff `hash(policyId || requestId) mod 10000 < canaryPercent * 100`.
pub fn is_sampled(policy_id: &str, request_id: &str, canary_percent: f64) -> bool {
    let mut hasher = Sha256::new();
    hasher.update(policy_id.as_bytes());
    hasher.update(request_id.as_bytes());
    let digest = hasher.finalize();
    let bucket = u64::from_be_bytes(digest[0..8].try_into().expect("8 bytes from a 32-byte digest")) % 10_000;
    (bucket as f64) < canary_percent * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_always_agree() {
        let a = is_sampled("policy-1", "req-1", 10.0);
        let b = is_sampled("policy-1", "req-1", 10.0);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_percent_never_samples() {
        for i in 0..50 {
            assert!(!is_sampled("policy-1", &format!("req-{i}"), 0.0));
        }
    }

    #[test]
    fn hundred_percent_always_samples() {
        for i in 0..50 {
            assert!(is_sampled("policy-1", &format!("req-{i}"), 100.0));
        }
    }
}
