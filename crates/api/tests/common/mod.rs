#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{TimeZone, Utc};
use farmchain_api::auth::jwt::JwtConfig;
use farmchain_api::config::ServerConfig;
use farmchain_api::router::build_app_router;
use farmchain_api::state::AppState;
use farmchain_core::clock::FixedClock;
use farmchain_core::lifecycle::TransitionPolicy;
use farmchain_core::service::ServiceSettings;
use farmchain_core::store::memory::{MemoryCropStore, MemoryFarmerDirectory};
use farmchain_core::taxonomy::Taxonomy;
use farmchain_core::types::{DbId, Timestamp};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// 2025-07-01T00:00:00Z, the time the test clock starts at.
pub fn test_now() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
}

/// Build a test `ServerConfig` with a small Colombian coffee taxonomy.
pub fn test_config(policy: TransitionPolicy) -> ServerConfig {
    let taxonomy = Taxonomy::new(
        vec!["Coffee".into(), "Cacao".into(), "Banana".into()],
        vec!["Antioquia".into(), "Huila".into()],
    )
    .unwrap();

    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 60,
        },
        services: ServiceSettings {
            transition_policy: policy,
            taxonomy,
            ..ServiceSettings::default()
        },
    }
}

/// The application over in-memory stores, with handles to poke at them.
pub struct TestApp {
    pub router: Router,
    pub crops: MemoryCropStore,
    pub farmers: MemoryFarmerDirectory,
    pub clock: Arc<FixedClock>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(TransitionPolicy::Permissive)
}

/// Build the full application router with all middleware layers.
pub fn build_test_app_with(policy: TransitionPolicy) -> TestApp {
    let crops = MemoryCropStore::new();
    let farmers = MemoryFarmerDirectory::new();
    let clock = Arc::new(FixedClock::new(test_now()));

    let state = AppState::new(
        Arc::new(crops.clone()),
        Arc::new(farmers.clone()),
        clock.clone(),
        test_config(policy),
        None,
    );

    TestApp {
        router: build_app_router(state),
        crops,
        farmers,
        clock,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn patch_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, None, Some(body)).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn farmer_body(wallet_digit: char, phone_suffix: &str) -> Value {
    json!({
        "wallet_address": format!("0x{}", wallet_digit.to_string().repeat(40)),
        "phone_number": format!("+234{phone_suffix}"),
        "name": "Lucía Restrepo",
        "location": {
            "state": "Antioquia",
            "lga": "Jardín",
            "coordinates": { "longitude": -75.8, "latitude": 5.6 }
        },
        "farm_size": 12.5,
        "crops": ["Coffee"]
    })
}

/// Register a farmer through the API and return `(farmer_id, token)`.
pub async fn register_farmer(app: Router, wallet_digit: char, phone_suffix: &str) -> (DbId, String) {
    let response = post_json(
        app,
        "/api/v1/auth/register",
        farmer_body(wallet_digit, phone_suffix),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let json = body_json(response).await;
    (
        json["data"]["farmer"]["id"].as_i64().unwrap(),
        json["data"]["token"].as_str().unwrap().to_string(),
    )
}

pub fn crop_body(farmer_id: DbId, variety: &str, state: &str, farm_size: f64) -> Value {
    json!({
        "farmer_id": farmer_id,
        "crop_type": "Coffee",
        "variety": variety,
        "planting_date": "2025-06-15T00:00:00Z",
        "expected_harvest": "2025-12-15T00:00:00Z",
        "farm_size": farm_size,
        "farm_location": {
            "state": state,
            "lga": "Jardín",
            "coordinates": { "longitude": -75.8, "latitude": 5.6 }
        }
    })
}

/// Create a crop through the API and return its id.
pub async fn create_crop(app: Router, token: &str, body: Value) -> DbId {
    let response = post_json_auth(app, "/api/v1/crops", body, token).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}
