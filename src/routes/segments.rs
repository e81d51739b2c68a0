// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Starred segments and per-segment effort history.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthSession;
use crate::models::{EffortHistory, SegmentEffort, StarredSegment};
use crate::services::activities::{drain_pages, PER_PAGE};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How many starred segments the list shows.
const STARRED_PER_PAGE: u32 = 30;

/// Effort lists change only when the athlete rides the segment again.
const EFFORTS_MAX_AGE_SECS: i64 = 3600;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/segments/starred", get(get_starred))
        .route("/api/segments/{id}/efforts", get(get_efforts))
}

/// Cache tag for a segment's effort list.
pub fn efforts_tag(segment_id: u64) -> String {
    format!("segment-efforts-{}", segment_id)
}

/// Sort starred segments by how often the athlete has ridden them, least
/// first.
pub fn sort_by_effort_count(segments: &mut [StarredSegment]) {
    segments.sort_by_key(|s| s.effort_count);
}

/// First page of starred segments, least-attempted first.
async fn get_starred(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<Vec<StarredSegment>>> {
    let mut segments = state
        .strava
        .starred_segments(&session.access_token, 1, STARRED_PER_PAGE)
        .await?;
    sort_by_effort_count(&mut segments);

    tracing::debug!(
        athlete_id = session.athlete_id,
        count = segments.len(),
        "Fetched starred segments"
    );
    Ok(Json(segments))
}

#[derive(Deserialize)]
struct EffortsQuery {
    /// Segment length in meters, used for efforts that carry none
    #[serde(default)]
    distance: Option<f64>,
}

#[derive(Serialize)]
pub struct EffortsResponse {
    pub efforts: Vec<SegmentEffort>,
    pub history: Option<EffortHistory>,
}

/// Parse a positive segment id.
pub fn parse_segment_id(raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::BadRequest("Invalid segment id".to_string())),
    }
}

/// All of the athlete's efforts on a segment with the speed sparkline.
async fn get_efforts(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(raw_id): Path<String>,
    Query(params): Query<EffortsQuery>,
) -> Result<Json<EffortsResponse>> {
    let segment_id = parse_segment_id(&raw_id)?;
    let now = Utc::now();
    let cache_key = format!("segment-efforts:{}", segment_id);

    let mut efforts: Vec<SegmentEffort> =
        match state.cache.get(session.athlete_id, &cache_key, now) {
            Some(cached) => cached,
            None => {
                let strava = &state.strava;
                let token = session.access_token.as_str();
                let fetched = drain_pages(PER_PAGE, move |page| {
                    strava.segment_efforts(token, segment_id, page, PER_PAGE)
                })
                .await?;

                state.cache.put_tagged(
                    session.athlete_id,
                    &cache_key,
                    &fetched,
                    vec![efforts_tag(segment_id)],
                    Duration::seconds(EFFORTS_MAX_AGE_SECS),
                    now,
                );
                fetched
            }
        };

    efforts.sort_by_key(|e| e.start_date);
    let history = EffortHistory::from_efforts(&efforts, params.distance.unwrap_or(0.0));

    tracing::debug!(
        athlete_id = session.athlete_id,
        segment_id,
        attempts = efforts.len(),
        "Built segment effort history"
    );

    Ok(Json(EffortsResponse { efforts, history }))
}
