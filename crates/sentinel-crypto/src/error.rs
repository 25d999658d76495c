use thiserror::Error;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("signing request timed out")]
    Timeout,

    #[error("transient signer error: {0}")]
    Transient(String),

    #[error("signer backend error: {0}")]
    Backend(String),

    #[error("no signer backend configured and local fallback is disallowed (requireKms or production environment)")]
    KmsRequired,

    #[error("unknown signer kid: {0}")]
    UnknownKid(String),
}

pub type SigningResult<T> = Result<T, SigningError>;
