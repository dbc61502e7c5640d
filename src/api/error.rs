//! Error taxonomy shared by every handler.
//!
//! Callers must be able to tell "your input is wrong" (400), "you are not
//! authorized" (401), and "the service is misconfigured" (500/503) apart, so
//! configuration problems never reuse the authentication-failure shape.
//! Downstream failures are mapped to the closest kind; raw detail goes to the
//! logs, not the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing caller input.
    #[error("{0}")]
    InvalidArgument(String),
    /// Bad, missing, or expired credential.
    #[error("{0}")]
    Unauthenticated(String),
    /// Access denied to the requested resource.
    #[error("{0}")]
    PermissionDenied(String),
    /// No pending record for the caller.
    #[error("{0}")]
    NotFound(String),
    /// The record exists but is no longer usable (e.g. expired).
    #[error("{0}")]
    FailedPrecondition(String),
    /// An operator-provided secret or setting is missing.
    #[error("{0}")]
    Configuration(String),
    /// An optional collaborator is not provisioned for this deployment.
    #[error("{0}")]
    Unavailable(String),
    /// Unexpected downstream failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) | Self::FailedPrecondition(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Configuration(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
