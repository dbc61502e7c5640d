use rsa::errors::Error as RsaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("unknown key id: {0}")]
    UnknownKid(String),
    #[error("failed to parse RSA key")]
    KeyParse,
    #[error("rsa error")]
    Rsa(#[from] RsaError),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("invalid audience")]
    InvalidAudience,
    #[error("authorized party not allowed: {0}")]
    UnauthorizedParty(String),
    #[error("keyset fetch failed: {0}")]
    KeysetFetch(String),
}
