//! HTTP surface: route table, middleware stack, and the server loop.

use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

use crate::email::EmailSender;
use crate::store::VerificationStore;
use crate::token::SubjectVerifier;

pub mod error;
pub mod handlers;
mod openapi;

pub use openapi::openapi;

use error::ApiError;
use handlers::{
    health, root, send_otp, token_bridge::BridgeState, upload_url::UploadState, verify_otp,
    VerificationPolicy,
};

/// Everything the handlers need, injected as request extensions.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn VerificationStore>,
    pub subjects: Arc<dyn SubjectVerifier>,
    pub bridge: Arc<BridgeState>,
    pub mailer: Arc<dyn EmailSender>,
    pub policy: Arc<VerificationPolicy>,
    pub uploads: UploadState,
}

/// Browser preflights get an empty 204; CORS headers come from the layer.
async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Known path, wrong verb.
async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({"error": "Method not allowed"})),
    )
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

#[must_use]
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health).options(preflight))
        .route("/openapi.json", get(openapi::serve_openapi))
        .route(
            "/v1/token/bridge",
            post(handlers::token_bridge::bridge)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/v1/verification/send",
            post(send_otp::send_otp)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/v1/verification/verify",
            post(verify_otp::verify_otp)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/v1/uploads/url",
            post(handlers::upload_url::upload_url)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(Extension(ctx.store))
                .layer(Extension(ctx.subjects))
                .layer(Extension(ctx.bridge))
                .layer(Extension(ctx.mailer))
                .layer(Extension(ctx.policy))
                .layer(Extension(ctx.uploads)),
        )
}

/// Bind and serve until interrupted.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server loop fails.
pub async fn serve(port: u16, ctx: AppContext) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, router(ctx).into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
