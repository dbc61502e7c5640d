use axum::Json;
use serde_json::{json, Value};
use tracing::instrument;

/// Index of the routes this service exposes.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Route index")),
    tag = "service",
)]
#[instrument]
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /v1/token/bridge": "exchange a session token for a bridge token",
            "POST /v1/verification/send": "email a one-time code",
            "POST /v1/verification/verify": "redeem a one-time code",
            "POST /v1/uploads/url": "presign a profile image upload",
            "GET /health": "service health",
            "GET /openapi.json": "OpenAPI document",
        },
    }))
}
