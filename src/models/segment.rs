// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava segment models and the effort-history sparkline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Starred segment from `GET /segments/starred`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarredSegment {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub activity_type: String,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub average_grade: f64,
    #[serde(default)]
    pub maximum_grade: f64,
    #[serde(default)]
    pub elevation_high: f64,
    #[serde(default)]
    pub elevation_low: f64,
    #[serde(default)]
    pub start_latlng: Option<Vec<f64>>,
    #[serde(default)]
    pub end_latlng: Option<Vec<f64>>,
    #[serde(default)]
    pub climb_category: i32,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub effort_count: u64,
    #[serde(default)]
    pub athlete_pr_effort: Option<PrEffort>,
}

/// The athlete's personal-record effort on a segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrEffort {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub activity_id: Option<u64>,
    #[serde(default)]
    pub elapsed_time: i64,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_kom: bool,
}

/// One attempt on a segment, trimmed to the fields the history needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentEffort {
    pub id: u64,
    pub start_date: DateTime<Utc>,
    /// Seconds
    #[serde(default)]
    pub elapsed_time: i64,
    /// Meters
    #[serde(default)]
    pub distance: f64,
}

/// Segment from `GET /segments/explore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreSegment {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub climb_category: i32,
    #[serde(default)]
    pub climb_category_desc: Option<String>,
    #[serde(default)]
    pub avg_grade: f64,
    #[serde(default)]
    pub start_latlng: Option<Vec<f64>>,
    #[serde(default)]
    pub end_latlng: Option<Vec<f64>>,
    #[serde(default)]
    pub elev_difference: f64,
    #[serde(default)]
    pub distance: f64,
    /// Encoded polyline (precision 5)
    #[serde(default)]
    pub points: String,
}

/// Envelope of the explore endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExploreResponse {
    #[serde(default)]
    pub segments: Vec<ExploreSegment>,
}

// ─── Effort History ──────────────────────────────────────────

/// Sparkline canvas width in px.
pub const SPARKLINE_WIDTH: f64 = 280.0;
/// Sparkline canvas height in px.
pub const SPARKLINE_HEIGHT: f64 = 60.0;
/// Inner padding in px.
pub const SPARKLINE_PADDING: f64 = 6.0;

/// Speed trend over all attempts, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffortHistory {
    pub attempts: usize,
    /// SVG path data (`M x y L x y ...`)
    pub path: String,
    /// Position of the fastest attempt on the canvas
    pub pr_point: (f64, f64),
    pub pr_speed_kmh: f64,
    /// Percent change from the first attempt's speed to the latest one
    pub change_since_first_pct: f64,
    pub width: f64,
    pub height: f64,
}

/// Average speed in km/h; zero when either input is zero.
pub fn speed_kmh(distance_m: f64, elapsed_s: i64) -> f64 {
    if distance_m == 0.0 || elapsed_s == 0 {
        return 0.0;
    }
    distance_m * 3.6 / elapsed_s as f64
}

impl EffortHistory {
    /// Build the sparkline from efforts (any order).
    ///
    /// Efforts without a distance use `segment_distance_m`. Returns `None`
    /// when there are no efforts.
    pub fn from_efforts(efforts: &[SegmentEffort], segment_distance_m: f64) -> Option<Self> {
        let mut sorted: Vec<&SegmentEffort> = efforts.iter().collect();
        sorted.sort_by_key(|e| e.start_date);

        let points: Vec<(i64, f64)> = sorted
            .iter()
            .map(|e| {
                let distance = if e.distance != 0.0 {
                    e.distance
                } else {
                    segment_distance_m
                };
                (
                    e.start_date.timestamp_millis(),
                    speed_kmh(distance, e.elapsed_time),
                )
            })
            .collect();

        let (first_x, first_speed) = *points.first()?;
        let (last_x, latest_speed) = *points.last()?;
        let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

        let x_scale = |v: i64| {
            if last_x == first_x {
                SPARKLINE_PADDING
            } else {
                SPARKLINE_PADDING
                    + ((v - first_x) as f64 / (last_x - first_x) as f64)
                        * (SPARKLINE_WIDTH - 2.0 * SPARKLINE_PADDING)
            }
        };
        // Faster is drawn higher.
        let y_scale = |v: f64| {
            if max_y == min_y {
                SPARKLINE_HEIGHT / 2.0
            } else {
                let r = (v - min_y) / (max_y - min_y);
                SPARKLINE_HEIGHT - SPARKLINE_PADDING - r * (SPARKLINE_HEIGHT - 2.0 * SPARKLINE_PADDING)
            }
        };

        let coords: Vec<(f64, f64)> = points.iter().map(|&(x, y)| (x_scale(x), y_scale(y))).collect();

        let path = coords
            .iter()
            .enumerate()
            .map(|(i, (x, y))| {
                let cmd = if i == 0 { "M" } else { "L" };
                format!("{} {:.2} {:.2}", cmd, x, y)
            })
            .collect::<Vec<_>>()
            .join(" ");

        let mut pr_idx = 0;
        for (i, p) in points.iter().enumerate() {
            if p.1 > points[pr_idx].1 {
                pr_idx = i;
            }
        }

        let change_since_first_pct = if first_speed > 0.0 {
            (latest_speed - first_speed) / first_speed * 100.0
        } else {
            0.0
        };

        Some(Self {
            attempts: points.len(),
            path,
            pr_point: coords[pr_idx],
            pr_speed_kmh: points[pr_idx].1,
            change_since_first_pct,
            width: SPARKLINE_WIDTH,
            height: SPARKLINE_HEIGHT,
        })
    }
}
