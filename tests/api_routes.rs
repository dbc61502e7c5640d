//! End-to-end route tests against the assembled router, using the in-process
//! store and a static subject verifier.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use unibridge::api::{
    handlers::{token_bridge::BridgeState, upload_url::UploadState, VerificationPolicy},
    router, AppContext,
};
use unibridge::email::LogEmailSender;
use unibridge::store::{MemStore, VerificationStore};
use unibridge::token::{Jwks, StaticSubject, TokenVerifier};
use unibridge::uploads::Storage;

fn empty_keyset() -> Jwks {
    Jwks::from_json(r#"{"keys":[]}"#).expect("empty keyset")
}

fn test_app() -> (Router, Arc<MemStore>) {
    let store = Arc::new(MemStore::new());

    let storage = Storage::new(
        "https://abc123.r2.cloudflarestorage.com",
        "auto",
        "user-content",
        "AKIDEXAMPLE",
        SecretString::from("secret".to_string()),
        "https://cdn.example.com",
    )
    .expect("storage");

    let ctx = AppContext {
        store: store.clone(),
        subjects: Arc::new(StaticSubject("me".to_string())),
        bridge: Arc::new(BridgeState {
            verifier: Arc::new(TokenVerifier::from_keyset(empty_keyset())),
            signer: None,
        }),
        mailer: Arc::new(LogEmailSender),
        policy: Arc::new(VerificationPolicy::new("@lpu.in")),
        uploads: UploadState {
            storage: Some(Arc::new(storage)),
        },
    };

    (router(ctx), store)
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer cred")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn index_lists_the_endpoints() {
    let (app, _) = test_app();
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["name"], "unibridge");
    assert!(body["endpoints"]["POST /v1/verification/send"].is_string());
}

#[tokio::test]
async fn health_reports_the_store() {
    let (app, _) = test_app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["store"], "ok");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::get("/openapi.json")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["paths"]["/v1/token/bridge"].is_object());
}

#[tokio::test]
async fn preflight_answers_no_content() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/v1/verification/send")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn wrong_verb_is_method_not_allowed_with_a_json_body() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::get("/v1/verification/send")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::get("/v1/nope")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bridge_without_a_signing_key_is_a_server_error() {
    let (app, _) = test_app();
    let response = app
        .oneshot(post_json(
            "/v1/token/bridge",
            serde_json::json!({"token": "anything"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn bridge_without_a_token_is_a_bad_request() {
    let (app, _) = test_app();
    let response = app
        .oneshot(post_json("/v1/token/bridge", serde_json::json!({})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verification_requires_a_credential() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/v1/verification/send")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email":"alice@lpu.in"}"#))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn otp_happy_path_verifies_the_profile() {
    let (app, store) = test_app();
    store.seed_profile("me").await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/verification/send",
            serde_json::json!({"email": "alice@lpu.in"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let code = store
        .get_pending("me")
        .await
        .expect("store")
        .expect("pending record")
        .code;

    // Wrong code first: rejected, record kept.
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/verification/verify",
            serde_json::json!({"otp": "000000"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/verification/verify",
            serde_json::json!({"otp": code}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);

    assert_eq!(
        store.profile("me").await,
        Some((true, Some("alice@lpu.in".to_string())))
    );

    // The code is spent.
    let response = app
        .oneshot(post_json(
            "/v1/verification/verify",
            serde_json::json!({"otp": code}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reissuing_a_code_retires_the_first_one() {
    let (app, store) = test_app();
    store.seed_profile("me").await;

    let send = || {
        app.clone().oneshot(post_json(
            "/v1/verification/send",
            serde_json::json!({"email": "alice@lpu.in"}),
        ))
    };

    assert_eq!(send().await.expect("response").status(), StatusCode::OK);
    let first_code = store
        .get_pending("me")
        .await
        .expect("store")
        .expect("pending record")
        .code;

    assert_eq!(send().await.expect("response").status(), StatusCode::OK);
    let second_code = store
        .get_pending("me")
        .await
        .expect("store")
        .expect("pending record")
        .code;

    // Only the latest code is live.
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/verification/verify",
            serde_json::json!({"otp": first_code}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json(
            "/v1/verification/verify",
            serde_json::json!({"otp": second_code}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn uploads_reject_foreign_namespaces() {
    let (app, _) = test_app();
    let response = app
        .oneshot(post_json(
            "/v1/uploads/url",
            serde_json::json!({"path": "users/other-user/x.webp"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn uploads_presign_the_callers_namespace() {
    let (app, _) = test_app();
    let response = app
        .oneshot(post_json(
            "/v1/uploads/url",
            serde_json::json!({"path": "users/me/profile/0.webp"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let upload_url = body["uploadUrl"].as_str().expect("uploadUrl");
    assert!(upload_url.contains("/user-content/users/me/profile/0.webp"));
    assert!(upload_url.contains("X-Amz-Signature="));
    assert_eq!(
        body["publicUrl"].as_str(),
        Some("https://cdn.example.com/users/me/profile/0.webp")
    );
}
