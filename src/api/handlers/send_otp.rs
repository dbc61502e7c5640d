//! OTP issuance: generate, persist, and deliver a verification code for the
//! caller's university email address.

use axum::{extract::Extension, http::HeaderMap, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

use super::{bearer_subject, generate_code, valid_university_email, OkResponse, VerificationPolicy};
use crate::api::error::ApiError;
use crate::email::{EmailSender, VerificationEmail};
use crate::store::{PendingVerification, VerificationStore};
use crate::token::SubjectVerifier;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendOtpRequest {
    pub email: Option<String>,
}

/// Issue a code for the caller. A new issuance replaces any pending record;
/// a delivery failure surfaces as 500 but does NOT roll the record back.
#[utoipa::path(
    post,
    path = "/v1/verification/send",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code issued", body = OkResponse),
        (status = 400, description = "Email missing or outside the institutional domain"),
        (status = 401, description = "Missing or invalid bearer credential"),
        (status = 500, description = "Email delivery failed"),
    ),
    tag = "verification",
)]
#[instrument(skip_all)]
pub async fn send_otp(
    headers: HeaderMap,
    Extension(subjects): Extension<Arc<dyn SubjectVerifier>>,
    Extension(store): Extension<Arc<dyn VerificationStore>>,
    Extension(mailer): Extension<Arc<dyn EmailSender>>,
    Extension(policy): Extension<Arc<VerificationPolicy>>,
    payload: Option<Json<SendOtpRequest>>,
) -> Result<Json<OkResponse>, ApiError> {
    let subject = bearer_subject(&headers, &subjects).await?;

    let email = payload
        .and_then(|Json(body)| body.email)
        .filter(|email| valid_university_email(email, &policy.email_suffix))
        .ok_or_else(|| {
            ApiError::InvalidArgument(format!("Valid {} email required", policy.email_suffix))
        })?;

    let code = generate_code();
    store
        .put_pending(
            &subject,
            PendingVerification::issue(email.clone(), code.clone(), policy.code_ttl()),
        )
        .await
        .map_err(|err| {
            error!("failed to persist pending verification: {err}");
            ApiError::Internal("Failed to issue code".to_string())
        })?;

    // The record stays even if delivery fails; the caller may retry sending.
    mailer
        .send(&VerificationEmail { to: email, code })
        .await
        .map_err(|err| {
            error!("failed to deliver verification email: {err}");
            ApiError::Internal("Failed to send email".to_string())
        })?;

    Ok(Json(OkResponse::ok()))
}
