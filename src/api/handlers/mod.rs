//! Route handlers plus the helpers they share: bearer introspection,
//! institutional email validation, and OTP generation.

pub mod health;
pub mod root;
pub mod send_otp;
pub mod token_bridge;
pub mod upload_url;
pub mod verify_otp;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Duration;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::token::SubjectVerifier;

/// How long an issued code stays valid.
pub const CODE_TTL_MINUTES: i64 = 10;

/// Settings for the verification flows.
#[derive(Debug, Clone)]
pub struct VerificationPolicy {
    /// Institutional email suffix, matched case-sensitively (e.g. `@lpu.in`).
    pub email_suffix: String,
}

impl VerificationPolicy {
    #[must_use]
    pub fn new(email_suffix: impl Into<String>) -> Self {
        Self {
            email_suffix: email_suffix.into(),
        }
    }

    #[must_use]
    pub fn code_ttl(&self) -> Duration {
        Duration::minutes(CODE_TTL_MINUTES)
    }
}

/// Body returned by the verification endpoints on success.
#[derive(Debug, Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub(crate) const fn ok() -> Self {
        Self { ok: true }
    }
}

/// Introspect the `Authorization: Bearer` header and return the caller's
/// subject id, or `Unauthenticated`.
pub(crate) async fn bearer_subject(
    headers: &HeaderMap,
    verifier: &Arc<dyn SubjectVerifier>,
) -> Result<String, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthenticated("Unauthorized".to_string()))?;

    verifier
        .subject_for(token)
        .await
        .ok_or_else(|| ApiError::Unauthenticated("Unauthorized".to_string()))
}

/// Whether `email` ends in the institutional suffix. The suffix is the
/// only gate; matching is case-sensitive, no folding.
pub(crate) fn valid_university_email(email: &str, suffix: &str) -> bool {
    email.ends_with(suffix)
}

/// Uniformly random 6-digit code; the offset keeps leading zeros out by
/// construction. A standard PRNG is enough for a code that only has to
/// survive guessing for ten minutes.
pub(crate) fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}
