//! Token bridge: exchange an externally issued session token for a
//! locally trusted credential carrying the same subject.

use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::token::{TokenSigner, TokenVerifier};

/// Everything the bridge handler needs: the issuer-side verifier and,
/// when a signing key is provisioned, the minting side.
#[derive(Debug)]
pub struct BridgeState {
    pub verifier: Arc<TokenVerifier>,
    pub signer: Option<TokenSigner>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BridgeRequest {
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BridgeResponse {
    pub token: String,
}

/// Verify the inbound session token and mint a bridge credential.
///
/// Configuration problems (no signing key) are reported as 500, never with
/// the 401 invalid-token shape.
#[utoipa::path(
    post,
    path = "/v1/token/bridge",
    request_body = BridgeRequest,
    responses(
        (status = 200, description = "Minted credential", body = BridgeResponse),
        (status = 400, description = "Missing token"),
        (status = 401, description = "Invalid session token"),
        (status = 500, description = "Bridge signing key not configured"),
    ),
    tag = "token",
)]
#[instrument(skip_all)]
pub async fn bridge(
    Extension(state): Extension<Arc<BridgeState>>,
    payload: Option<Json<BridgeRequest>>,
) -> Result<Json<BridgeResponse>, ApiError> {
    let token = payload
        .and_then(|Json(body)| body.token)
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidArgument("Missing token".to_string()))?;

    // Config check comes before verification so operators see 500, not 401.
    let signer = state
        .signer
        .as_ref()
        .ok_or_else(|| ApiError::Configuration("Bridge signing key not configured".to_string()))?;

    let claims = state.verifier.verify(&token).await.map_err(|err| {
        debug!("session token rejected: {err}");
        ApiError::Unauthenticated("Invalid token".to_string())
    })?;

    let subject = claims
        .sub
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated("Invalid token".to_string()))?;

    let minted = signer.mint(&subject).map_err(|err| {
        error!("failed to mint bridge credential: {err}");
        ApiError::Internal("Failed to mint credential".to_string())
    })?;

    Ok(Json(BridgeResponse { token: minted }))
}
