//! OTP verification: compare the submitted code against the pending record
//! and flip the caller's student-verification flag on success.

use axum::{extract::Extension, http::HeaderMap, Json};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument, warn};
use utoipa::ToSchema;

use super::{bearer_subject, OkResponse};
use crate::api::error::ApiError;
use crate::store::VerificationStore;
use crate::token::SubjectVerifier;

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    pub otp: Option<String>,
}

/// Check a submitted code. Mismatches keep the record so the caller can
/// retry; expiry and success both consume it.
#[utoipa::path(
    post,
    path = "/v1/verification/verify",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code accepted, profile updated", body = OkResponse),
        (status = 400, description = "Code missing, wrong, or expired"),
        (status = 401, description = "Missing or invalid bearer credential"),
        (status = 404, description = "No pending verification for this caller"),
        (status = 500, description = "Profile update failed"),
    ),
    tag = "verification",
)]
#[instrument(skip_all)]
pub async fn verify_otp(
    headers: HeaderMap,
    Extension(subjects): Extension<Arc<dyn SubjectVerifier>>,
    Extension(store): Extension<Arc<dyn VerificationStore>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Result<Json<OkResponse>, ApiError> {
    let subject = bearer_subject(&headers, &subjects).await?;

    let submitted = payload
        .and_then(|Json(body)| body.otp)
        .filter(|otp| !otp.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidArgument("OTP required".to_string()))?;

    let pending = store
        .get_pending(&subject)
        .await
        .map_err(|err| {
            error!("failed to load pending verification: {err}");
            ApiError::Internal("Verification lookup failed".to_string())
        })?
        .ok_or_else(|| ApiError::NotFound("No OTP request found".to_string()))?;

    // Mismatch before expiry: a wrong code never consumes the record.
    if submitted != pending.code {
        return Err(ApiError::InvalidArgument("Invalid OTP".to_string()));
    }

    if pending.is_expired(Utc::now()) {
        if let Err(err) = store.delete_pending(&subject).await {
            warn!("failed to discard expired verification: {err}");
        }
        return Err(ApiError::FailedPrecondition("OTP expired".to_string()));
    }

    // Consuming and reading are one atomic step; a concurrent caller who
    // already spent the code leaves nothing behind.
    let consumed = store
        .delete_pending(&subject)
        .await
        .map_err(|err| {
            error!("failed to consume verification record: {err}");
            ApiError::Internal("Verification failed".to_string())
        })?
        .ok_or_else(|| ApiError::NotFound("No OTP request found".to_string()))?;

    store
        .mark_verified(&subject, &consumed.email)
        .await
        .map_err(|err| {
            error!("failed to update profile after verification: {err}");
            ApiError::Internal("Profile update failed".to_string())
        })?;

    Ok(Json(OkResponse::ok()))
}
