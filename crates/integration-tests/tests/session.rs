//! Sign-in, sign-out, profile bootstrap and request ids.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use washday_integration_tests::TestContext;
use washday_server::gateway::Relation;
use washday_server::middleware::REQUEST_ID_HEADER;

#[tokio::test]
async fn test_signed_in_session_reports_identity_and_role() {
    let ctx = TestContext::new();
    let (id, cookie) = ctx.vendor().await;

    let response = ctx
        .request(Method::GET, "/api/session", Some(&cookie), None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["identity_id"], id.to_string());
    assert_eq!(response.body["role"], "vendor");
}

#[tokio::test]
async fn test_sign_out_ends_the_session() {
    let ctx = TestContext::new();
    let (_, cookie) = ctx.customer().await;

    let signed_out = ctx
        .request(Method::DELETE, "/auth/session", Some(&cookie), None)
        .await;
    let after = ctx
        .request(Method::GET, "/api/session", Some(&cookie), None)
        .await;

    assert_eq!(signed_out.status, StatusCode::NO_CONTENT);
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_and_blank_tokens_are_refused() {
    let ctx = TestContext::new();

    let unknown = ctx
        .request(
            Method::POST,
            "/auth/session",
            None,
            Some(json!({ "access_token": "forged" })),
        )
        .await;
    let blank = ctx
        .request(
            Method::POST,
            "/auth/session",
            None,
            Some(json!({ "access_token": "  " })),
        )
        .await;

    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_identity_scoped_routes_redirect_to_login() {
    let ctx = TestContext::new();

    for path in ["/api/session", "/api/profile", "/api/vehicles", "/api/bookings"] {
        let response = ctx.request(Method::GET, path, None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(response.body["redirect"], "/auth/login", "{path}");
    }
}

#[tokio::test]
async fn test_profile_is_created_once_on_first_sight() {
    let ctx = TestContext::new();
    let (id, cookie) = ctx.customer().await;

    let first = ctx
        .request(Method::GET, "/api/profile", Some(&cookie), None)
        .await;
    let second = ctx
        .request(Method::GET, "/api/profile", Some(&cookie), None)
        .await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(first.body["id"], id.to_string());
    assert_eq!(first.body["role"], "customer");
    assert_eq!(ctx.gateway.count(Relation::Profiles).await, 1);
}

#[tokio::test]
async fn test_profile_update_requires_full_name() {
    let ctx = TestContext::new();
    let (_, cookie) = ctx.customer().await;

    let blank = ctx
        .request(
            Method::PUT,
            "/api/profile",
            Some(&cookie),
            Some(json!({ "full_name": " ", "city": "Oakland" })),
        )
        .await;
    let named = ctx
        .request(
            Method::PUT,
            "/api/profile",
            Some(&cookie),
            Some(json!({ "full_name": "Dana Driver", "city": "Oakland", "zip_code": "94607" })),
        )
        .await;

    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(named.status, StatusCode::OK, "{named:?}");
    assert_eq!(named.body["full_name"], "Dana Driver");
    assert_eq!(named.body["zip_code"], "94607");
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let ctx = TestContext::new();

    let echoed = ctx
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(REQUEST_ID_HEADER, "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let generated = ctx
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(echoed.status(), StatusCode::OK);
    assert_eq!(echoed.headers()[REQUEST_ID_HEADER], "req-123");
    assert!(!generated.headers()[REQUEST_ID_HEADER].is_empty());
}
