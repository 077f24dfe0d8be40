//! New-identity webhook.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};

use washday_core::IdentityId;
use washday_integration_tests::{TestContext, send, send_request};
use washday_server::gateway::Relation;

const PATH: &str = "/webhooks/new-identity";

fn payload(id: IdentityId, role: &str) -> Value {
    json!({
        "type": "INSERT",
        "table": "users",
        "record": {
            "id": id.to_string(),
            "email": "new.driver@example.com",
            "raw_user_meta_data": { "full_name": "New Driver", "role": role },
        },
    })
}

fn raw(body: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(PATH)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_first_delivery_creates_profile_and_redelivery_is_idempotent() {
    let ctx = TestContext::new();
    let id = IdentityId::generate();

    let first = ctx
        .request(Method::POST, PATH, None, Some(payload(id, "customer")))
        .await;
    let second = ctx
        .request(Method::POST, PATH, None, Some(payload(id, "customer")))
        .await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["message"], "Profile created successfully");
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["message"], "Profile already exists");
    assert_eq!(ctx.gateway.count(Relation::Profiles).await, 1);
}

#[tokio::test]
async fn test_profile_takes_name_and_role_from_metadata() {
    let ctx = TestContext::new();
    let id = IdentityId::generate();

    ctx.request(Method::POST, PATH, None, Some(payload(id, "vendor")))
        .await;

    let rows = ctx.gateway.rows(Relation::Profiles).await;
    assert_eq!(rows[0].get("full_name"), Some(&json!("New Driver")));
    assert_eq!(rows[0].get("role"), Some(&json!("vendor")));
}

#[tokio::test]
async fn test_record_without_id_or_email_is_invalid_user_data() {
    let ctx = TestContext::new();

    for body in [
        json!({ "type": "INSERT" }),
        json!({ "record": { "email": "a@example.com" } }),
        json!({ "record": { "id": IdentityId::generate().to_string() } }),
        json!({ "record": { "id": "not-a-uuid", "email": "a@example.com" } }),
    ] {
        let response = ctx.request(Method::POST, PATH, None, Some(body)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"], "Invalid user data");
    }
    assert_eq!(ctx.gateway.count(Relation::Profiles).await, 0);
}

#[tokio::test]
async fn test_malformed_json_is_invalid_user_data() {
    let ctx = TestContext::new();

    let (response, _) = send_request(&ctx.router, raw("{not json", None)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Invalid user data");
}

#[tokio::test]
async fn test_configured_secret_is_required_as_bearer_token() {
    let secret = "wh_9f3Kq2LmZx7Rt5Vb8Nc1Hd4Jg6Pw0Sy";
    let ctx = TestContext::with_webhook_secret(secret);
    let body = payload(IdentityId::generate(), "customer").to_string();

    let (missing, _) = send_request(&ctx.router, raw(&body, None)).await;
    let (wrong, _) = send_request(&ctx.router, raw(&body, Some("nope"))).await;
    let (right, _) = send_request(&ctx.router, raw(&body, Some(secret))).await;

    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(right.status, StatusCode::OK);
    assert_eq!(ctx.gateway.count(Relation::Profiles).await, 1);
}

#[tokio::test]
async fn test_missing_store_credentials_answer_500() {
    let router = TestContext::unconfigured();

    let (response, _) = send(
        &router,
        Method::POST,
        PATH,
        None,
        Some(payload(IdentityId::generate(), "customer")),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error"], "Backend credentials are missing");
}

#[tokio::test]
async fn test_store_failure_reports_details() {
    let ctx = TestContext::new();
    ctx.gateway.fail_writes_to(Relation::Profiles).await;

    let response = ctx
        .request(
            Method::POST,
            PATH,
            None,
            Some(payload(IdentityId::generate(), "customer")),
        )
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error"], "Failed to insert profile");
    assert!(response.body["details"].is_string());
}
