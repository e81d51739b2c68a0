// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth authentication routes.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::middleware::auth::{
    create_session_jwt, decode_session, removal_cookie, session_cookie, StravaTokens,
    SESSION_COOKIE,
};
use crate::routes::explore::{GEO_LAT_COOKIE, GEO_LNG_COOKIE, GEO_RADIUS_COOKIE};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/strava", get(auth_start))
        .route("/auth/strava/callback", get(auth_callback))
        .route("/auth/signout", post(signout))
        .route("/auth/logout", get(logout))
}

/// Query parameters for starting OAuth flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Frontend URL to redirect back to after OAuth completes.
    /// Must live under FRONTEND_URL; anything else falls back to it.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Sign `frontend_url` plus a timestamp into an opaque OAuth state value.
pub fn sign_state(frontend_url: &str, timestamp_ms: u128, secret: &[u8]) -> Result<String> {
    // Create the data payload: "frontend_url|timestamp_hex"
    let state_payload = format!("{}|{:x}", frontend_url, timestamp_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(state_payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    // "payload|signature_hex", base64 encoded for the URL
    let signed_state = format!("{}|{}", state_payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Verify HMAC signature and decode the frontend URL from the OAuth state parameter.
pub fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "frontend_url|timestamp_hex|signature_hex"; the URL itself
    // may not contain '|'.
    let parts: Vec<&str> = state_str.rsplitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }
    let (signature_hex, timestamp_hex, frontend_url) = (parts[0], parts[1], parts[2]);

    let payload = format!("{}|{}", frontend_url, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if !bool::from(signature_hex.as_bytes().ct_eq(expected_signature.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(frontend_url.to_string())
}

/// Base URL of this API as seen by the browser.
fn service_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:8080");

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };
    format!("{}://{}", scheme, host)
}

/// Start OAuth flow - redirect to Strava authorization.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthStartParams>,
    headers: HeaderMap,
) -> Result<Redirect> {
    let frontend_url = params
        .redirect_uri
        .filter(|uri| uri.starts_with(&state.config.frontend_url))
        .unwrap_or_else(|| state.config.frontend_url.clone());

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let oauth_state = sign_state(&frontend_url, timestamp, &state.config.oauth_state_key)?;
    let callback_url = format!("{}/auth/strava/callback", service_url(&headers));
    let auth_url = state.strava.authorize_url(&callback_url, &oauth_state);

    tracing::info!(
        client_id = %state.config.strava_client_id,
        frontend_url = %frontend_url,
        "Starting OAuth flow, redirecting to Strava"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens, create session cookie.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    // Decode and verify frontend URL from state parameter
    let frontend_url = verify_and_decode_state(&params.state, &state.config.oauth_state_key)
        .unwrap_or_else(|| {
            tracing::warn!(
                "Invalid or tampered state parameter, falling back to default frontend URL"
            );
            state.config.frontend_url.clone()
        });

    // Check for OAuth errors (e.g. the athlete declined)
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Strava");
        let redirect = format!("{}?error={}", frontend_url, urlencoding::encode(&error));
        return Ok((jar, Redirect::temporary(&redirect)));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");
    let exchange = state.strava.exchange_code(&code).await?;

    let athlete_id = exchange.athlete.id;
    let tokens = StravaTokens {
        access_token: exchange.access_token,
        refresh_token: exchange.refresh_token,
        expires_at: exchange.expires_at,
    };

    let jwt = create_session_jwt(athlete_id, &tokens, &state.config.session_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(
        athlete_id,
        firstname = %exchange.athlete.firstname,
        "OAuth successful, session created"
    );

    let jar = jar.add(session_cookie(jwt, state.config.secure_cookies()));
    Ok((jar, Redirect::temporary(&format!("{}/menu", frontend_url))))
}

/// Expire the session and geo cookies.
fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    [SESSION_COOKIE, GEO_LAT_COOKIE, GEO_LNG_COOKIE, GEO_RADIUS_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| jar.add(removal_cookie(name)))
}

/// Sign out - revoke Strava access (best effort) and clear cookies.
async fn signout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    let claims = jar
        .get(SESSION_COOKIE)
        .and_then(|c| decode_session(c.value(), &state.config.session_signing_key));

    if let Some(claims) = claims {
        if let Err(e) = state.strava.deauthorize(&claims.access_token).await {
            tracing::warn!(error = %e, "Strava deauthorization failed, clearing session anyway");
        }
        if let Ok(athlete_id) = claims.sub.parse::<u64>() {
            state.cache.clear_athlete(athlete_id);
            tracing::info!(athlete_id, "Signed out");
        }
    }

    (clear_session_cookies(jar), Redirect::to("/"))
}

/// Logout - clear cookies and go home.
async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (clear_session_cookies(jar), Redirect::temporary("/"))
}
