//! Remote signing backends: KMS and signing-proxy.
//!
//! The wire format of either service is an external collaborator's
//! detail; what matters here is the *shape* of the call
//! (`POST {digest, kid} -> {signature, kid}`) and the base64 signature
//! encoding it returns, which downstream code depends on.

use crate::backend::SigningBackend;
use crate::error::{SigningError, SigningResult};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct SignRequest<'a> {
    digest_b64: String,
    key_id: &'a str,
}

#[derive(Deserialize)]
struct SignResponse {
    signature_b64: String,
    kid: String,
}

/// KMS-backed signer: selected when a KMS key id is configured (highest
/// priority backend).
pub struct KmsSigner {
    client: reqwest::Client,
    endpoint: String,
    key_id: String,
}

impl KmsSigner {
    pub fn new(endpoint: impl Into<String>, key_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builds with a valid timeout"),
            endpoint: endpoint.into(),
            key_id: key_id.into(),
        }
    }
}

#[async_trait]
impl SigningBackend for KmsSigner {
    async fn sign(&self, digest: &[u8; 32]) -> SigningResult<(Vec<u8>, String)> {
        remote_sign(&self.client, &self.endpoint, digest, &self.key_id).await
    }

    fn verify(&self, _digest: &[u8; 32], _signature: &[u8], _kid: &str) -> bool {
        // KMS key material never leaves the KMS; verification against a
        // KMS-issued signature goes through `KeyRegistry`, which holds the
        // public key the KMS published at registration time.
        false
    }

    fn name(&self) -> &'static str {
        "kms"
    }
}

/// Remote signing-proxy: selected when a proxy URL is configured and no
/// KMS key id is set.
pub struct SigningProxySigner {
    client: reqwest::Client,
    endpoint: String,
    key_id: String,
}

impl SigningProxySigner {
    pub fn new(endpoint: impl Into<String>, key_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builds with a valid timeout"),
            endpoint: endpoint.into(),
            key_id: key_id.into(),
        }
    }
}

#[async_trait]
impl SigningBackend for SigningProxySigner {
    async fn sign(&self, digest: &[u8; 32]) -> SigningResult<(Vec<u8>, String)> {
        remote_sign(&self.client, &self.endpoint, digest, &self.key_id).await
    }

    fn verify(&self, _digest: &[u8; 32], _signature: &[u8], _kid: &str) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "signing-proxy"
    }
}

async fn remote_sign(
    client: &reqwest::Client,
    endpoint: &str,
    digest: &[u8; 32],
    key_id: &str,
) -> SigningResult<(Vec<u8>, String)> {
    let body = SignRequest {
        digest_b64: base64::engine::general_purpose::STANDARD.encode(digest),
        key_id,
    };

    let resp = client
        .post(endpoint)
        .json(&body)
        .send()
        .await
        .map_err(classify_reqwest_error)?;

    if !resp.status().is_success() {
        let status = resp.status();
        return Err(if status.is_server_error() {
            SigningError::Transient(format!("signer returned {status}"))
        } else {
            SigningError::Backend(format!("signer returned {status}"))
        });
    }

    let parsed: SignResponse = resp
        .json()
        .await
        .map_err(|e| SigningError::Backend(e.to_string()))?;

    let sig = base64::engine::general_purpose::STANDARD
        .decode(parsed.signature_b64)
        .map_err(|e| SigningError::Backend(format!("invalid base64 signature: {e}")))?;

    Ok((sig, parsed.kid))
}

fn classify_reqwest_error(err: reqwest::Error) -> SigningError {
    if err.is_timeout() || err.is_connect() {
        SigningError::Transient(err.to_string())
    } else {
        SigningError::Backend(err.to_string())
    }
}
