// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location-based segment exploration.
//!
//! The browser posts its position once; it is kept in short-lived,
//! script-readable cookies and read back when exploring.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthSession;
use crate::models::ExploreSegment;
use crate::services::geo::{bounds_from_center_radius, segments_to_feature_collection, Bounds, DEFAULT_RADIUS_KM};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub const GEO_LAT_COOKIE: &str = "strava_geo_lat";
pub const GEO_LNG_COOKIE: &str = "strava_geo_lng";
pub const GEO_RADIUS_COOKIE: &str = "strava_geo_radius";

/// Geo cookie lifetime (seconds).
const GEO_COOKIE_MAX_AGE_SECS: i64 = 600;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/geo", post(set_location))
        .route("/api/explore", get(explore))
}

// ─── Location ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct GeoRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "lat must be between -90 and 90"))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "lng must be between -180 and 180"))]
    pub lng: f64,
    #[validate(range(min = 0.1, max = 100.0, message = "radius_km must be between 0.1 and 100"))]
    #[serde(default)]
    pub radius_km: Option<f64>,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

fn geo_cookie(name: &'static str, value: f64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value.to_string()))
        .path("/")
        .http_only(false)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(GEO_COOKIE_MAX_AGE_SECS))
        .build()
}

/// Remember the athlete's position for exploration.
async fn set_location(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<GeoRequest>,
) -> Result<(CookieJar, Json<OkResponse>)> {
    body.validate()?;

    let secure = state.config.secure_cookies();
    let mut jar = jar
        .add(geo_cookie(GEO_LAT_COOKIE, body.lat, secure))
        .add(geo_cookie(GEO_LNG_COOKIE, body.lng, secure));
    if let Some(radius) = body.radius_km {
        jar = jar.add(geo_cookie(GEO_RADIUS_COOKIE, radius, secure));
    }

    Ok((jar, Json(OkResponse { ok: true })))
}

/// Center and radius stored in the geo cookies.
pub fn location_from_cookies(jar: &CookieJar) -> Result<(f64, f64, f64)> {
    let read = |name: &str| {
        jar.get(name)
            .and_then(|c| c.value().trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };

    let (Some(lat), Some(lng)) = (read(GEO_LAT_COOKIE), read(GEO_LNG_COOKIE)) else {
        return Err(AppError::BadRequest(
            "Location not set; POST /api/geo first".to_string(),
        ));
    };
    let radius = read(GEO_RADIUS_COOKIE)
        .filter(|r| *r > 0.0)
        .unwrap_or(DEFAULT_RADIUS_KM);

    Ok((lat, lng, radius))
}

// ─── Explore ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct ExploreQuery {
    #[serde(default)]
    activity_type: Option<String>,
}

#[derive(Serialize)]
pub struct ExploreResult {
    pub center: [f64; 2],
    pub radius_km: f64,
    pub bounds: [f64; 4],
    pub segments: Vec<ExploreSegment>,
    pub feature_collection: geojson::FeatureCollection,
}

fn parse_activity_type(raw: Option<&str>) -> Result<&'static str> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None | Some("running") => Ok("running"),
        Some("riding") => Ok("riding"),
        Some(other) => Err(AppError::BadRequest(format!(
            "activity_type must be 'running' or 'riding', got '{}'",
            other
        ))),
    }
}

/// Popular segments around the stored location.
async fn explore(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    jar: CookieJar,
    Query(params): Query<ExploreQuery>,
) -> Result<Json<ExploreResult>> {
    let activity_type = parse_activity_type(params.activity_type.as_deref())?;
    let (lat, lng, radius_km) = location_from_cookies(&jar)?;
    let bounds: Bounds = bounds_from_center_radius(lat, lng, radius_km);

    tracing::debug!(
        athlete_id = session.athlete_id,
        bounds = %bounds.to_query_value(),
        activity_type,
        "Exploring segments"
    );

    let response = state
        .strava
        .explore_segments(&session.access_token, &bounds, activity_type)
        .await?;
    let feature_collection = segments_to_feature_collection(&response.segments);

    Ok(Json(ExploreResult {
        center: [lat, lng],
        radius_km,
        bounds: [bounds.sw_lat, bounds.sw_lng, bounds.ne_lat, bounds.ne_lng],
        segments: response.segments,
        feature_collection,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_requires_lat_and_lng() {
        let jar = CookieJar::new().add(Cookie::new(GEO_LAT_COOKIE, "37.4"));
        assert!(matches!(location_from_cookies(&jar), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_location_defaults_radius() {
        let jar = CookieJar::new()
            .add(Cookie::new(GEO_LAT_COOKIE, "37.4"))
            .add(Cookie::new(GEO_LNG_COOKIE, "-122.2"));
        assert_eq!(location_from_cookies(&jar).unwrap(), (37.4, -122.2, DEFAULT_RADIUS_KM));
    }

    #[test]
    fn test_location_rejects_garbage() {
        let jar = CookieJar::new()
            .add(Cookie::new(GEO_LAT_COOKIE, "north"))
            .add(Cookie::new(GEO_LNG_COOKIE, "-122.2"));
        assert!(location_from_cookies(&jar).is_err());
    }

    #[test]
    fn test_parse_activity_type() {
        assert_eq!(parse_activity_type(None).unwrap(), "running");
        assert_eq!(parse_activity_type(Some("riding")).unwrap(), "riding");
        assert!(parse_activity_type(Some("swimming")).is_err());
    }

    #[test]
    fn test_geo_request_validation() {
        let ok = GeoRequest {
            lat: 37.4,
            lng: -122.2,
            radius_km: Some(3.0),
        };
        assert!(ok.validate().is_ok());

        let bad = GeoRequest {
            lat: 91.0,
            lng: 0.0,
            radius_km: None,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_geo_cookie_is_script_readable() {
        let header = geo_cookie(GEO_LAT_COOKIE, 37.5, false).to_string();
        assert!(header.starts_with("strava_geo_lat=37.5"));
        assert!(!header.contains("HttpOnly"));
        assert!(header.contains("Max-Age=600"));
    }
}
