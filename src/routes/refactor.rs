// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bulk rename / retype routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthSession;
use crate::services::activities::list_all_activities;
use crate::services::refactor::{
    bulk_update, retype_candidates, run_retype, search, BulkResult, RefactorRow, SearchCriteria,
    SearchRow, StravaUpdater,
};
use crate::services::strava::ActivityUpdate;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Most ids accepted by one bulk update.
const MAX_BULK_IDS: u64 = 500;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/refactor-activities/search", get(search_activities))
        .route("/api/refactor-activities/run", get(run))
        .route("/api/refactor-activities/update", post(update_one))
        .route("/api/refactor-activities/bulk-update", post(update_many))
}

fn pacing(state: &AppState) -> Duration {
    Duration::from_millis(state.config.request_pacing_ms)
}

// ─── Search ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub total: usize,
    pub matches: Vec<SearchRow>,
}

/// Find activities by name fragment and date range.
async fn search_activities(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let criteria = SearchCriteria::parse(
        params.q.as_deref(),
        params.from.as_deref(),
        params.to.as_deref(),
    )?;

    if criteria.is_empty() {
        return Ok(Json(SearchResponse {
            total: 0,
            matches: Vec::new(),
        }));
    }

    let activities =
        list_all_activities(&state.strava, &session.access_token, pacing(&state)).await?;
    let matches = search(&criteria, &activities);

    tracing::info!(
        athlete_id = session.athlete_id,
        scanned = activities.len(),
        matched = matches.len(),
        "Activity search complete"
    );

    Ok(Json(SearchResponse {
        total: matches.len(),
        matches,
    }))
}

// ─── Retype Run ──────────────────────────────────────────────

#[derive(Deserialize)]
struct RunQuery {
    q: Option<String>,
    target: Option<String>,
    dry: Option<String>,
}

#[derive(Serialize)]
pub struct RunResponse {
    pub dry_run: bool,
    pub target: String,
    pub rows: Vec<RefactorRow>,
}

/// Anything but an explicit `0` is a dry run.
fn is_dry_run(raw: Option<&str>) -> bool {
    raw.map(str::trim) != Some("0")
}

/// Retype every activity whose name matches `q` to `target`.
async fn run(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Query(params): Query<RunQuery>,
) -> Result<Json<RunResponse>> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    let target = params.target.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() || target.is_empty() {
        return Err(AppError::BadRequest(
            "Provide both an activity name (q) and a new type (target)".to_string(),
        ));
    }
    let dry_run = is_dry_run(params.dry.as_deref());

    let activities =
        list_all_activities(&state.strava, &session.access_token, pacing(&state)).await?;
    let candidates = retype_candidates(&activities, query, target);

    tracing::info!(
        athlete_id = session.athlete_id,
        candidates = candidates.len(),
        target,
        dry_run,
        "Running activity retype"
    );

    let updater = StravaUpdater {
        strava: &state.strava,
        access_token: &session.access_token,
    };
    let rows = run_retype(&updater, &candidates, target, dry_run, pacing(&state)).await;

    Ok(Json(RunResponse {
        dry_run,
        target: target.to_string(),
        rows,
    }))
}

// ─── Updates ─────────────────────────────────────────────────

fn validate_name_or_type(name: &Option<String>, activity_type: &Option<String>) -> std::result::Result<(), ValidationError> {
    let update = ActivityUpdate::new(name.as_deref(), activity_type.as_deref());
    if update.is_empty() {
        let mut err = ValidationError::new("missing_update");
        err.message = Some("Provide at least one of name/type".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_update_request"))]
pub struct UpdateRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub activity_type: Option<String>,
}

fn validate_update_request(req: &UpdateRequest) -> std::result::Result<(), ValidationError> {
    validate_name_or_type(&req.name, &req.activity_type)
}

#[derive(Serialize)]
pub struct UpdateResponse {
    pub ok: bool,
}

/// Rename and/or retype one activity.
async fn update_one(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>> {
    body.validate()?;

    let update = ActivityUpdate::new(body.name.as_deref(), body.activity_type.as_deref());
    state
        .strava
        .update_activity(&session.access_token, body.id, &update)
        .await?;

    tracing::info!(athlete_id = session.athlete_id, activity_id = body.id, "Activity updated");
    Ok(Json(UpdateResponse { ok: true }))
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_bulk_request"))]
pub struct BulkUpdateRequest {
    #[validate(length(min = 1, max = MAX_BULK_IDS, message = "ids must be a non-empty list"))]
    pub ids: Vec<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub activity_type: Option<String>,
}

fn validate_bulk_request(req: &BulkUpdateRequest) -> std::result::Result<(), ValidationError> {
    validate_name_or_type(&req.name, &req.activity_type)
}

#[derive(Serialize)]
pub struct BulkUpdateResponse {
    pub ok: bool,
    pub results: Vec<BulkResult>,
}

/// Apply the same rename / retype to many activities, one at a time.
async fn update_many(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(body): Json<BulkUpdateRequest>,
) -> Result<Json<BulkUpdateResponse>> {
    body.validate()?;

    let update = ActivityUpdate::new(body.name.as_deref(), body.activity_type.as_deref());
    let updater = StravaUpdater {
        strava: &state.strava,
        access_token: &session.access_token,
    };
    let results = bulk_update(&updater, &body.ids, &update, pacing(&state)).await;

    let failed = results.iter().filter(|r| !r.ok).count();
    tracing::info!(
        athlete_id = session.athlete_id,
        requested = body.ids.len(),
        attempted = results.len(),
        failed,
        "Bulk update complete"
    );

    Ok(Json(BulkUpdateResponse { ok: true, results }))
}
