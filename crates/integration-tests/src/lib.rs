//! Integration tests for Washday.
//!
//! Each test drives the full router in-process: sessions, request ids and
//! error mapping included. The hosted backend is replaced by
//! [`MemoryGateway`] and [`InMemoryIdentityProvider`], so no database or
//! network is needed.
//!
//! ```bash
//! cargo test -p washday-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{Days, Utc};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use washday_core::{Email, IdentityId, Role};
use washday_server::config::ServerConfig;
use washday_server::gateway::{DataGateway, memory::MemoryGateway};
use washday_server::identity::{Identity, IdentityProvider, memory::InMemoryIdentityProvider};
use washday_server::middleware::SESSION_COOKIE_NAME;
use washday_server::state::AppState;

/// A response, read to completion.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration suitable for in-process tests: plain http, no Sentry.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://localhost/washday_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        store: None,
        webhook_secret: None,
        log_json: false,
        sentry_dsn: None,
        sentry_environment: "test".to_string(),
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A booking date safely in the future.
#[must_use]
pub fn future_date() -> String {
    (Utc::now().date_naive() + Days::new(7))
        .format("%Y-%m-%d")
        .to_string()
}

pub struct TestContext {
    pub router: Router,
    pub gateway: Arc<MemoryGateway>,
    pub identities: Arc<InMemoryIdentityProvider>,
}

impl TestContext {
    /// A fully configured server over empty in-memory collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// As [`TestContext::new`], with a bearer secret on the webhook.
    #[must_use]
    pub fn with_webhook_secret(secret: &str) -> Self {
        let mut config = test_config();
        config.webhook_secret = Some(SecretString::from(secret.to_string()));
        Self::with_config(config)
    }

    fn with_config(config: ServerConfig) -> Self {
        Self::with_gateway(config, MemoryGateway::new())
    }

    /// A server over a specific gateway, e.g. one with a relation missing.
    #[must_use]
    pub fn with_gateway(config: ServerConfig, gateway: MemoryGateway) -> Self {
        let gateway = Arc::new(gateway);
        let identities = Arc::new(InMemoryIdentityProvider::new());
        let store: Arc<dyn DataGateway> = gateway.clone();
        let identity: Arc<dyn IdentityProvider> = identities.clone();
        let state = AppState::from_parts(config, None, Some(store), Some(identity));
        Self {
            router: washday_server::app(state, MemoryStore::default()),
            gateway,
            identities,
        }
    }

    /// A server whose backend credentials are missing.
    #[must_use]
    pub fn unconfigured() -> Router {
        let state = AppState::from_parts(test_config(), None, None, None);
        washday_server::app(state, MemoryStore::default())
    }

    /// Send one request, optionally carrying a session cookie.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        send(&self.router, method, uri, cookie, body).await.0
    }

    /// Register an identity with the provider and sign it in.
    /// Returns the session cookie.
    pub async fn sign_in(&self, role: Role, email: &str) -> (IdentityId, String) {
        let id = IdentityId::generate();
        let token = format!("token-{id}");
        self.identities
            .register(
                token.clone(),
                Identity {
                    id,
                    email: Email::parse(email).unwrap(),
                    role,
                    full_name: None,
                },
            )
            .await;

        let (response, cookie) = send(
            &self.router,
            Method::POST,
            "/auth/session",
            None,
            Some(json!({ "access_token": token })),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK, "sign-in failed: {response:?}");
        (id, cookie.expect("sign-in did not set a session cookie"))
    }

    pub async fn customer(&self) -> (IdentityId, String) {
        self.sign_in(Role::Customer, "driver@example.com").await
    }

    pub async fn vendor(&self) -> (IdentityId, String) {
        self.sign_in(Role::Vendor, "suds@example.com").await
    }

    /// Register a vehicle for the session and return its id.
    pub async fn create_vehicle(&self, cookie: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/vehicles",
                Some(cookie),
                Some(json!({
                    "make": "Honda",
                    "model": "Civic",
                    "year": 2020,
                    "color": "Blue",
                    "license_plate": "ABC123",
                    "vehicle_type": "sedan",
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{response:?}");
        response.body["id"].as_str().unwrap().to_string()
    }

    /// Create a listing for the vendor session and return its id.
    pub async fn create_service(&self, cookie: &str, name: &str, price: f64) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/vendor/services",
                Some(cookie),
                Some(json!({
                    "name": name,
                    "description": "Hand wash and dry",
                    "service_type": "basic_wash",
                    "price": price,
                    "duration": 60,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{response:?}");
        response.body["id"].as_str().unwrap().to_string()
    }

    /// A booking form naming the given selection.
    #[must_use]
    pub fn booking_form(vendor_id: IdentityId, service_id: &str, vehicle_id: &str) -> Value {
        json!({
            "service_id": service_id,
            "vendor_id": vendor_id.to_string(),
            "vehicle_id": vehicle_id,
            "booking_date": future_date(),
            "start_time": "10:00",
            "notes": "Gate code 1234",
        })
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Send one request against `router`. Returns the response and the
/// session cookie it set, if any.
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (TestResponse, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send_request(router, request).await
}

/// Send a prepared request, e.g. one with a raw body or extra headers.
pub async fn send_request(
    router: &Router,
    request: Request<Body>,
) -> (TestResponse, Option<String>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
        .map(str::to_string);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (TestResponse { status, body }, cookie)
}
