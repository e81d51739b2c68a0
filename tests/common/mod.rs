// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use activity_dashboard::config::Config;
use activity_dashboard::middleware::auth::{create_session_jwt, StravaTokens};
use activity_dashboard::routes::create_router;
use activity_dashboard::AppState;
use axum::http::{header, Response};
use std::sync::Arc;

/// Create a test app whose Strava client points at a closed local port.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

/// Same as `create_test_app` but with a caller-supplied config.
#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config));
    (create_router(state.clone()), state)
}

/// Session JWT whose Strava token expires `strava_ttl_secs` from now.
#[allow(dead_code)]
pub fn create_session_with_ttl(athlete_id: u64, strava_ttl_secs: i64, signing_key: &[u8]) -> String {
    let tokens = StravaTokens {
        access_token: "test_access_token".to_string(),
        refresh_token: "test_refresh_token".to_string(),
        expires_at: chrono::Utc::now().timestamp() + strava_ttl_secs,
    };
    create_session_jwt(athlete_id, &tokens, signing_key).expect("Failed to create test JWT")
}

/// Session JWT with a Strava token that stays valid for a day.
#[allow(dead_code)]
pub fn create_test_jwt(athlete_id: u64, signing_key: &[u8]) -> String {
    create_session_with_ttl(athlete_id, 24 * 60 * 60, signing_key)
}

/// All `Set-Cookie` header values of a response.
#[allow(dead_code)]
pub fn set_cookie_headers<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// The `Set-Cookie` value for `name`, panicking if absent.
#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
