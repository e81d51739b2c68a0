// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie authentication middleware.
//!
//! The session is an HS256 JWT carrying the athlete's Strava tokens, so no
//! server-side session store is needed. Strava access tokens that are about
//! to expire are refreshed here and the re-issued cookie is appended to the
//! response.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "strava_session";

/// Session lifetime (days).
const SESSION_DAYS: i64 = 30;

/// Refresh the Strava token when it expires within this many seconds.
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (Strava athlete ID)
    pub sub: String,
    /// Strava access token
    pub access_token: String,
    /// Strava refresh token
    pub refresh_token: String,
    /// Strava access token expiry (Unix timestamp)
    pub strava_expires_at: i64,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Strava tokens stored in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StravaTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Authenticated athlete extracted from the session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub athlete_id: u64,
    pub access_token: String,
}

/// Middleware that requires a valid session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") => h[7..].to_string(),
            _ => return Err(StatusCode::UNAUTHORIZED),
        }
    };

    let claims = decode_session(&token, &state.config.session_signing_key)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let athlete_id: u64 = claims.sub.parse().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let mut tokens = StravaTokens {
        access_token: claims.access_token,
        refresh_token: claims.refresh_token,
        expires_at: claims.strava_expires_at,
    };

    let mut refreshed_cookie = None;
    if needs_refresh(tokens.expires_at, chrono::Utc::now().timestamp()) {
        tracing::info!(athlete_id, "Refreshing Strava access token");

        let refreshed = state
            .strava
            .refresh_token(&tokens.refresh_token)
            .await
            .map_err(|e| {
                tracing::warn!(athlete_id, error = %e, "Strava token refresh failed");
                StatusCode::UNAUTHORIZED
            })?;

        tokens = StravaTokens {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
            expires_at: refreshed.expires_at,
        };

        let jwt = create_session_jwt(athlete_id, &tokens, &state.config.session_signing_key)
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to re-issue session JWT");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
        refreshed_cookie = Some(session_cookie(jwt, state.config.secure_cookies()));
    }

    request.extensions_mut().insert(AuthSession {
        athlete_id,
        access_token: tokens.access_token,
    });

    let mut response = next.run(request).await;

    if let Some(cookie) = refreshed_cookie {
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    Ok(response)
}

/// Whether a Strava token expiring at `expires_at` should be refreshed now.
pub fn needs_refresh(expires_at: i64, now: i64) -> bool {
    expires_at - now <= REFRESH_MARGIN_SECS
}

/// Decode and validate a session JWT.
pub fn decode_session(token: &str, signing_key: &[u8]) -> Option<SessionClaims> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .ok()
}

/// Create a JWT for a user session.
pub fn create_session_jwt(
    athlete_id: u64,
    tokens: &StravaTokens,
    signing_key: &[u8],
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = SessionClaims {
        sub: athlete_id.to_string(),
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token.clone(),
        strava_expires_at: tokens.expires_at,
        iat: now,
        exp: now + SESSION_DAYS as usize * 24 * 60 * 60,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// HttpOnly session cookie carrying `jwt`.
pub fn session_cookie(jwt: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, jwt))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::days(SESSION_DAYS))
        .build()
}

/// Expired cookie that removes `name` from the browser.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}
