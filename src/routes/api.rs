// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::format::{format_duration, format_km, format_pace_min_km, pretty_type_label};
use crate::middleware::auth::AuthSession;
use crate::models::{summarize_by_month, MonthSummary, SummaryActivity};
use crate::services::activities::{fetch_all_activities, StravaWindowFetcher};
use crate::services::strava::StravaAthlete;
use crate::time_utils::{format_utc_rfc3339, start_of_next_year_utc_epoch, start_of_year_utc_epoch};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

/// First year the dashboard offers (Strava launched in 2009).
pub const MIN_YEAR: i32 = 2009;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// API routes (require authentication via session).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/activities", get(get_current_year))
        .route("/api/activities/{year}", get(get_year))
        .route("/api/cache/revalidate", post(revalidate_cache))
}

// ─── User Profile ────────────────────────────────────────────

/// Get the athlete's Strava profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<StravaAthlete>> {
    let athlete = state.strava.get_athlete(&session.access_token).await?;
    Ok(Json(athlete))
}

// ─── Activities Dashboard ────────────────────────────────────

/// Year being shown and the epoch range fetched for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearView {
    pub year: i32,
    /// Inclusive start (Jan 1 00:00:00 UTC)
    pub after: i64,
    /// Exclusive end: now for the current year, else next Jan 1
    pub before_exclusive: i64,
    pub months_to_show: usize,
    pub prev_year: Option<i32>,
    pub next_year: Option<i32>,
}

impl YearView {
    /// Clamp `requested` into `[MIN_YEAR, current year]`; unparsable or
    /// absent years mean the current year.
    pub fn new(requested: Option<i32>, now: DateTime<Utc>) -> Self {
        let now_year = now.year();
        let year = requested.unwrap_or(now_year).clamp(MIN_YEAR, now_year);

        let after = start_of_year_utc_epoch(year);
        let (before_exclusive, months_to_show) = if year == now_year {
            (now.timestamp(), now.month() as usize)
        } else {
            (start_of_next_year_utc_epoch(year), 12)
        };

        Self {
            year,
            after,
            before_exclusive,
            months_to_show,
            prev_year: (year > MIN_YEAR).then_some(year - 1),
            next_year: (year < now_year).then_some(year + 1),
        }
    }
}

/// Year dashboard response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct YearDashboardResponse {
    pub year: i32,
    pub prev_year: Option<i32>,
    pub next_year: Option<i32>,
    pub months_to_show: usize,
    pub total_activities: usize,
    pub months: Vec<MonthTile>,
}

/// One month tile with display labels.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MonthTile {
    pub month_idx: usize,
    pub month_name: String,
    pub count: u32,
    pub distance_m: f64,
    pub distance_km: String,
    pub moving_time_s: i64,
    pub moving_time: String,
    /// Categories sorted by moving time, longest first
    pub by_type: Vec<TypeRow>,
    pub longest_run: Option<ActivityHighlight>,
    pub longest_ride: Option<ActivityHighlight>,
    pub avg_ride_watts: Option<i64>,
    pub avg_pace_runs: Option<f64>,
    pub avg_pace_label: Option<String>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TypeRow {
    pub sport_type: String,
    pub label: String,
    pub count: u32,
    pub distance_m: f64,
    pub distance_km: String,
    pub moving_time_s: i64,
    pub moving_time: String,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityHighlight {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub name: String,
    pub start_date: String,
    pub distance_km: String,
    pub moving_time: String,
}

impl From<&SummaryActivity> for ActivityHighlight {
    fn from(a: &SummaryActivity) -> Self {
        Self {
            id: a.id,
            name: a.name.clone(),
            start_date: format_utc_rfc3339(a.start_date),
            distance_km: format_km(a.distance),
            moving_time: format_duration(a.moving_time),
        }
    }
}

impl From<&MonthSummary> for MonthTile {
    fn from(m: &MonthSummary) -> Self {
        let mut by_type: Vec<TypeRow> = m
            .by_type
            .iter()
            .map(|(category, totals)| TypeRow {
                sport_type: category.to_string(),
                label: pretty_type_label(category),
                count: totals.count,
                distance_m: totals.distance,
                distance_km: format_km(totals.distance),
                moving_time_s: totals.moving_time,
                moving_time: format_duration(totals.moving_time),
            })
            .collect();
        // Stable sort keeps first-seen order among equal moving times.
        by_type.sort_by(|a, b| b.moving_time_s.cmp(&a.moving_time_s));

        Self {
            month_idx: m.month_idx,
            month_name: MONTH_NAMES[m.month_idx % 12].to_string(),
            count: m.totals.count,
            distance_m: m.totals.distance,
            distance_km: format_km(m.totals.distance),
            moving_time_s: m.totals.moving_time,
            moving_time: format_duration(m.totals.moving_time),
            by_type,
            longest_run: m.longest_run.as_ref().map(ActivityHighlight::from),
            longest_ride: m.longest_ride.as_ref().map(ActivityHighlight::from),
            avg_ride_watts: m.avg_ride_watts,
            avg_pace_runs: m.avg_pace_runs,
            avg_pace_label: m.avg_pace_runs.map(format_pace_min_km),
        }
    }
}

/// Build the dashboard body from already-fetched activities.
pub fn build_dashboard(view: &YearView, activities: &[SummaryActivity]) -> YearDashboardResponse {
    let months = summarize_by_month(activities);

    YearDashboardResponse {
        year: view.year,
        prev_year: view.prev_year,
        next_year: view.next_year,
        months_to_show: view.months_to_show,
        total_activities: activities.len(),
        months: months
            .iter()
            .take(view.months_to_show)
            .map(MonthTile::from)
            .collect(),
    }
}

async fn get_current_year(
    state: State<Arc<AppState>>,
    session: Extension<AuthSession>,
) -> Result<Json<YearDashboardResponse>> {
    year_dashboard(state, session, None).await
}

async fn get_year(
    state: State<Arc<AppState>>,
    session: Extension<AuthSession>,
    Path(year): Path<String>,
) -> Result<Json<YearDashboardResponse>> {
    year_dashboard(state, session, year.parse().ok()).await
}

/// Fetch the year's activities month by month and summarize them.
async fn year_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    requested: Option<i32>,
) -> Result<Json<YearDashboardResponse>> {
    let now = Utc::now();
    let view = YearView::new(requested, now);

    tracing::debug!(
        athlete_id = session.athlete_id,
        year = view.year,
        requested = ?requested,
        "Building activity dashboard"
    );

    let fetcher = StravaWindowFetcher {
        strava: &state.strava,
        cache: &state.cache,
        athlete_id: session.athlete_id,
        now,
    };
    let activities = fetch_all_activities(
        &fetcher,
        &session.access_token,
        view.after,
        view.before_exclusive,
        now,
    )
    .await?;

    tracing::info!(
        athlete_id = session.athlete_id,
        year = view.year,
        count = activities.len(),
        "Fetched activities for dashboard"
    );

    Ok(Json(build_dashboard(&view, &activities)))
}

// ─── Cache ───────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RevalidateRequest {
    #[validate(
        length(min = 1, max = 128, message = "tag must be 1-128 characters"),
        custom(function = "validate_not_blank")
    )]
    pub tag: String,
}

fn validate_not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("tag must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub removed: usize,
}

/// Drop the athlete's cached responses carrying a tag.
async fn revalidate_cache(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(body): Json<RevalidateRequest>,
) -> Result<Json<RevalidateResponse>> {
    body.validate()?;

    let removed = state.cache.revalidate_tag(session.athlete_id, body.tag.trim());
    tracing::info!(athlete_id = session.athlete_id, tag = %body.tag, removed, "Cache revalidated");

    Ok(Json(RevalidateResponse {
        revalidated: true,
        removed,
    }))
}
