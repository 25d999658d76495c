//! Artifact checksum handling for `createMemoryNode`.
//!
//! When the service itself ingests artifact content, it must stream-hash
//! it and reject on a mismatch against any caller-supplied digest.
//! Trusting a caller-supplied `sha256` without content is only valid on
//! service-to-service paths the transport layer has already authenticated.

use crate::error::{MemoryError, MemoryResult};
use sentinel_types::ArtifactInput;
use sha2::{Digest, Sha256};

pub fn hash_bytes(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Resolve the checksum and manifest signature id for one artifact,
/// falling back to `inherited_manifest_signature_id` when the artifact
/// itself doesn't carry one.
pub fn resolve_artifact(
    input: &ArtifactInput,
    inherited_manifest_signature_id: Option<&str>,
) -> MemoryResult<(String, String)> {
    let sha256 = match (&input.content, &input.sha256) {
        (Some(content), Some(expected)) => {
            let actual = hash_bytes(content);
            if &actual != expected {
                return Err(MemoryError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
            actual
        }
        (Some(content), None) => hash_bytes(content),
        (None, Some(expected)) => expected.clone(),
        (None, None) => {
            return Err(MemoryError::InvalidInput(
                "artifact must carry content to hash or a pre-computed sha256".to_string(),
            ))
        }
    };

    let manifest_signature_id = input
        .manifest_signature_id
        .clone()
        .or_else(|| inherited_manifest_signature_id.map(|s| s.to_string()))
        .ok_or_else(|| {
            MemoryError::InvalidInput(
                "artifact requires a manifestSignatureId, per-artifact or inherited".to_string(),
            )
        })?;

    Ok((sha256, manifest_signature_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_hash_is_rejected() {
        let input = ArtifactInput {
            artifact_url: "s3://bucket/key".to_string(),
            sha256: Some("deadbeef".to_string()),
            manifest_signature_id: Some("sig-1".to_string()),
            content: Some(b"hello".to_vec()),
        };
        let err = resolve_artifact(&input, None).unwrap_err();
        assert!(matches!(err, MemoryError::ChecksumMismatch { .. }));
    }

    #[test]
    fn trusted_caller_sha256_without_content_is_accepted() {
        let input = ArtifactInput {
            artifact_url: "s3://bucket/key".to_string(),
            sha256: Some("abc123".to_string()),
            manifest_signature_id: None,
            content: None,
        };
        let (sha256, manifest) = resolve_artifact(&input, Some("inherited-sig")).unwrap();
        assert_eq!(sha256, "abc123");
        assert_eq!(manifest, "inherited-sig");
    }

    #[test]
    fn missing_manifest_signature_is_rejected() {
        let input = ArtifactInput {
            artifact_url: "s3://bucket/key".to_string(),
            sha256: Some("abc123".to_string()),
            manifest_signature_id: None,
            content: None,
        };
        let err = resolve_artifact(&input, None).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
    }
}
