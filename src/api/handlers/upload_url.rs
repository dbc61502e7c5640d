//! Mint short-lived presigned PUT URLs for profile images, scoped to the
//! caller's own storage namespace.

use axum::{extract::Extension, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

use super::bearer_subject;
use crate::api::error::ApiError;
use crate::token::SubjectVerifier;
use crate::uploads::{object_key, PathPolicyError, Storage};

/// Optional so the service can run without object storage configured; the
/// handler answers 503 in that case.
#[derive(Clone, Default)]
pub struct UploadState {
    pub storage: Option<Arc<Storage>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadUrlRequest {
    pub path: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub public_url: String,
}

#[utoipa::path(
    post,
    path = "/v1/uploads/url",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Presigned URL issued", body = UploadUrlResponse),
        (status = 400, description = "Missing path or disallowed object name"),
        (status = 401, description = "Missing or invalid bearer credential"),
        (status = 403, description = "Path outside the caller's namespace"),
        (status = 503, description = "Object storage not configured"),
    ),
    tag = "uploads",
)]
#[instrument(skip_all)]
pub async fn upload_url(
    headers: HeaderMap,
    Extension(subjects): Extension<Arc<dyn SubjectVerifier>>,
    Extension(state): Extension<UploadState>,
    payload: Option<Json<UploadUrlRequest>>,
) -> Result<Json<UploadUrlResponse>, ApiError> {
    let subject = bearer_subject(&headers, &subjects).await?;

    let storage = state
        .storage
        .ok_or_else(|| ApiError::Unavailable("Uploads not configured".to_string()))?;

    let path = payload.and_then(|Json(body)| body.path).unwrap_or_default();
    let key = object_key(&path, &subject).map_err(|err| match err {
        PathPolicyError::OutsideNamespace => ApiError::PermissionDenied(err.to_string()),
        PathPolicyError::Empty | PathPolicyError::ProfileIndex => {
            ApiError::InvalidArgument(err.to_string())
        }
    })?;

    let upload_url = storage.presign_put(&key).map_err(|err| {
        error!("failed to presign upload: {err}");
        ApiError::Internal("Failed to create upload URL".to_string())
    })?;

    Ok(Json(UploadUrlResponse {
        public_url: storage.public_url(&key),
        upload_url,
    }))
}
