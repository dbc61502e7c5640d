use axum::Json;
use utoipa::OpenApi;

use super::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "unibridge",
        description = "Identity bridge: session token exchange, university email verification, and presigned profile uploads",
        license(name = "BSD-3-Clause"),
    ),
    paths(
        handlers::root::root,
        handlers::health::health,
        handlers::token_bridge::bridge,
        handlers::send_otp::send_otp,
        handlers::verify_otp::verify_otp,
        handlers::upload_url::upload_url,
    ),
    components(schemas(
        handlers::OkResponse,
        handlers::health::HealthResponse,
        handlers::token_bridge::BridgeRequest,
        handlers::token_bridge::BridgeResponse,
        handlers::send_otp::SendOtpRequest,
        handlers::verify_otp::VerifyOtpRequest,
        handlers::upload_url::UploadUrlRequest,
        handlers::upload_url::UploadUrlResponse,
    )),
    tags(
        (name = "service", description = "Index and health"),
        (name = "token", description = "Session token exchange"),
        (name = "verification", description = "University email verification"),
        (name = "uploads", description = "Presigned profile image uploads"),
    )
)]
struct ApiDoc;

/// The generated OpenAPI document.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub(crate) async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = openapi();
        for path in [
            "/",
            "/health",
            "/v1/token/bridge",
            "/v1/verification/send",
            "/v1/verification/verify",
            "/v1/uploads/url",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
