// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava summary activity model as returned by the list endpoints.

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Category used when an activity carries neither `sport_type` nor `type`.
pub const OTHER_CATEGORY: &str = "Other";

/// Summary activity from `GET /athlete/activities`.
///
/// Numeric fields default to zero when Strava omits them or sends `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryActivity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Legacy free-text category ("Run", "Ride", "Walk", ...)
    #[serde(rename = "type", default)]
    pub activity_type: Option<String>,
    /// Finer-grained category ("TrailRun", "GravelRide", ...)
    #[serde(default)]
    pub sport_type: Option<String>,
    pub start_date: DateTime<Utc>,
    /// Wall-clock start in the athlete's timezone. Strava encodes it with a
    /// `Z` suffix even though it is not UTC.
    #[serde(default)]
    pub start_date_local: Option<DateTime<FixedOffset>>,
    /// Distance in meters
    #[serde(default, deserialize_with = "null_as_zero")]
    pub distance: f64,
    /// Moving time in seconds
    #[serde(default, deserialize_with = "null_as_zero")]
    pub moving_time: i64,
    /// Elapsed time in seconds
    #[serde(default, deserialize_with = "null_as_zero")]
    pub elapsed_time: i64,
    #[serde(default)]
    pub average_watts: Option<f64>,
    #[serde(default)]
    pub weighted_average_watts: Option<f64>,
    #[serde(default)]
    pub max_watts: Option<f64>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
}

/// Treat an explicit `null` like a missing field.
fn null_as_zero<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl SummaryActivity {
    /// Category used for grouping this activity.
    pub fn category(&self) -> &str {
        effective_category(self.sport_type.as_deref(), self.activity_type.as_deref())
    }

    /// Zero-based month of the athlete's local start time.
    ///
    /// Uses the wall-clock fields of `start_date_local` as written, falling
    /// back to the UTC `start_date` when the local time is absent.
    pub fn local_month_index(&self) -> usize {
        match self.start_date_local {
            Some(local) => local.naive_local().month0() as usize,
            None => self.start_date.month0() as usize,
        }
    }

    /// Power figure used for time-weighted averaging.
    pub fn effective_watts(&self) -> f64 {
        self.weighted_average_watts
            .or(self.average_watts)
            .unwrap_or(0.0)
    }

    /// Whether this activity has positive distance and moving time.
    pub fn has_positive_effort(&self) -> bool {
        self.moving_time > 0 && self.distance > 0.0
    }
}

/// Resolve the grouping category.
///
/// Precedence: `sport_type`, then `type`, then [`OTHER_CATEGORY`]. Empty
/// strings count as absent.
pub fn effective_category<'a>(sport_type: Option<&'a str>, activity_type: Option<&'a str>) -> &'a str {
    sport_type
        .filter(|s| !s.is_empty())
        .or_else(|| activity_type.filter(|s| !s.is_empty()))
        .unwrap_or(OTHER_CATEGORY)
}

/// Run variants counted toward longest run and run pace.
pub fn is_run(category: &str) -> bool {
    matches!(category, "Run" | "VirtualRun")
}

/// Ride variants counted toward longest ride and ride power.
pub fn is_ride(category: &str) -> bool {
    matches!(category, "Ride" | "VirtualRide")
}
