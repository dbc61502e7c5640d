use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::store::VerificationStore;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub store: &'static str,
}

/// Liveness plus a store round-trip.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and store are reachable", body = HealthResponse),
        (status = 503, description = "Store is unreachable"),
    ),
    tag = "service",
)]
#[instrument(skip_all)]
pub async fn health(
    Extension(store): Extension<Arc<dyn VerificationStore>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (status, store_status) = match store.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(err) => {
            warn!("store ping failed: {err}");
            (StatusCode::SERVICE_UNAVAILABLE, "unreachable")
        }
    };

    (
        status,
        Json(HealthResponse {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            store: store_status,
        }),
    )
}
