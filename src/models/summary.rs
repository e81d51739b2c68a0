// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Monthly activity aggregates for the year dashboard.
//!
//! Summaries are rebuilt from the full activity list on every request;
//! nothing here is stored or updated incrementally.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::models::activity::{is_ride, is_run, SummaryActivity};

/// Number of month buckets produced by [`summarize_by_month`].
pub const MONTHS_PER_YEAR: usize = 12;

/// Running totals for a month or a category within a month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    /// Meters
    pub distance: f64,
    /// Seconds
    pub moving_time: i64,
    pub count: u32,
}

impl Totals {
    fn add(&mut self, activity: &SummaryActivity) {
        self.distance += activity.distance;
        self.moving_time += activity.moving_time;
        self.count += 1;
    }
}

/// Per-category totals keyed by category, in first-seen order.
///
/// Serializes as a JSON object whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeBreakdown {
    entries: Vec<(String, Totals)>,
}

impl TypeBreakdown {
    /// Totals for `category`, inserted at the end if not yet present.
    pub fn entry(&mut self, category: &str) -> &mut Totals {
        let idx = match self.entries.iter().position(|(k, _)| k == category) {
            Some(idx) => idx,
            None => {
                self.entries.push((category.to_string(), Totals::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    pub fn get(&self, category: &str) -> Option<&Totals> {
        self.entries
            .iter()
            .find(|(k, _)| k == category)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Totals)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TypeBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Aggregate for one calendar month (0 = January).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub month_idx: usize,
    pub totals: Totals,
    pub by_type: TypeBreakdown,
    /// Activities bucketed into this month, in input order.
    #[serde(skip)]
    pub items: Vec<SummaryActivity>,
    pub longest_run: Option<SummaryActivity>,
    pub longest_ride: Option<SummaryActivity>,
    /// Time-weighted average power over rides, in watts.
    pub avg_ride_watts: Option<i64>,
    /// Aggregate run pace in decimal minutes per km (5.5 = 5:30/km).
    pub avg_pace_runs: Option<f64>,
}

impl MonthSummary {
    fn empty(month_idx: usize) -> Self {
        Self {
            month_idx,
            totals: Totals::default(),
            by_type: TypeBreakdown::default(),
            items: Vec::new(),
            longest_run: None,
            longest_ride: None,
            avg_ride_watts: None,
            avg_pace_runs: None,
        }
    }

    fn add(&mut self, activity: &SummaryActivity) {
        self.items.push(activity.clone());
        self.totals.add(activity);

        let category = activity.category();
        self.by_type.entry(category).add(activity);

        if is_run(category) && exceeds(activity, self.longest_run.as_ref()) {
            self.longest_run = Some(activity.clone());
        }
        if is_ride(category) && exceeds(activity, self.longest_ride.as_ref()) {
            self.longest_ride = Some(activity.clone());
        }
    }

    fn compute_averages(&mut self) {
        let mut acc = EffortAccumulator::default();
        for activity in self.items.iter().filter(|a| a.has_positive_effort()) {
            let category = activity.category();
            let moving_time = activity.moving_time as f64;
            if is_ride(category) {
                acc.ride_time += moving_time;
                acc.ride_watt_seconds += moving_time * activity.effective_watts();
            }
            if is_run(category) {
                acc.run_time += moving_time;
                acc.run_distance += activity.distance;
            }
        }

        self.avg_ride_watts = acc.avg_ride_watts();
        self.avg_pace_runs = acc.avg_pace_min_per_km();
    }
}

/// Strict `>` so the first activity at a given distance keeps the title.
fn exceeds(candidate: &SummaryActivity, incumbent: Option<&SummaryActivity>) -> bool {
    incumbent.map_or(true, |current| candidate.distance > current.distance)
}

#[derive(Default)]
struct EffortAccumulator {
    ride_time: f64,
    ride_watt_seconds: f64,
    run_time: f64,
    run_distance: f64,
}

impl EffortAccumulator {
    fn avg_ride_watts(&self) -> Option<i64> {
        if self.ride_time > 0.0 && self.ride_watt_seconds != 0.0 {
            Some((self.ride_watt_seconds / self.ride_time).round() as i64)
        } else {
            None
        }
    }

    /// (seconds / 60) / (meters / 1000)
    fn avg_pace_min_per_km(&self) -> Option<f64> {
        if self.run_time > 0.0 && self.run_distance > 0.0 {
            Some((self.run_time * 1000.0) / (self.run_distance * 60.0))
        } else {
            None
        }
    }
}

/// Reduce activities into twelve month summaries, January first.
///
/// Activities are bucketed by local month-of-year only; callers pre-filter
/// to the year they want.
pub fn summarize_by_month(activities: &[SummaryActivity]) -> Vec<MonthSummary> {
    let mut months: Vec<MonthSummary> = (0..MONTHS_PER_YEAR).map(MonthSummary::empty).collect();

    for activity in activities {
        months[activity.local_month_index()].add(activity);
    }

    for month in &mut months {
        month.compute_averages();
    }

    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn make_activity(id: u64, sport: &str, date: &str, distance: f64, moving_time: i64) -> SummaryActivity {
        SummaryActivity {
            id,
            name: format!("Test Activity {}", id),
            activity_type: Some(sport.to_string()),
            sport_type: Some(sport.to_string()),
            start_date: DateTime::parse_from_rfc3339(date).unwrap().with_timezone(&Utc),
            start_date_local: Some(DateTime::parse_from_rfc3339(date).unwrap()),
            distance,
            moving_time,
            elapsed_time: moving_time,
            average_watts: None,
            weighted_average_watts: None,
            max_watts: None,
            average_heartrate: None,
            max_heartrate: None,
        }
    }

    fn with_watts(mut activity: SummaryActivity, watts: f64) -> SummaryActivity {
        activity.average_watts = Some(watts);
        activity
    }

    #[test]
    fn test_empty_input_yields_twelve_empty_months() {
        let months = summarize_by_month(&[]);

        assert_eq!(months.len(), 12);
        for (idx, m) in months.iter().enumerate() {
            assert_eq!(m.month_idx, idx);
            assert_eq!(m.totals.count, 0);
            assert!(m.by_type.is_empty());
            assert!(m.longest_run.is_none());
            assert!(m.longest_ride.is_none());
            assert!(m.avg_ride_watts.is_none());
            assert!(m.avg_pace_runs.is_none());
        }
    }

    #[test]
    fn test_totals_and_type_breakdown() {
        let activities = vec![
            make_activity(1, "Ride", "2024-01-05T08:00:00Z", 20000.0, 3600),
            make_activity(2, "Run", "2024-01-06T08:00:00Z", 5000.0, 1500),
            make_activity(3, "Ride", "2024-01-07T08:00:00Z", 30000.0, 4000),
            make_activity(4, "Walk", "2024-02-01T08:00:00Z", 2000.0, 1200),
        ];

        let months = summarize_by_month(&activities);
        let jan = &months[0];

        assert_eq!(jan.totals.count, 3);
        assert_eq!(jan.totals.distance, 55000.0);
        assert_eq!(jan.totals.moving_time, 9100);
        assert_eq!(jan.by_type.keys().collect::<Vec<_>>(), vec!["Ride", "Run"]);
        assert_eq!(jan.by_type.get("Ride").unwrap().count, 2);
        assert_eq!(jan.by_type.get("Ride").unwrap().distance, 50000.0);
        assert_eq!(months[1].by_type.get("Walk").unwrap().moving_time, 1200);
    }

    #[test]
    fn test_longest_run_tie_keeps_first() {
        let activities = vec![
            make_activity(1, "Run", "2024-03-01T08:00:00Z", 10000.0, 3000),
            make_activity(2, "Run", "2024-03-02T08:00:00Z", 10000.0, 2900),
            make_activity(3, "VirtualRun", "2024-03-03T08:00:00Z", 8000.0, 2400),
        ];

        let months = summarize_by_month(&activities);
        assert_eq!(months[2].longest_run.as_ref().unwrap().id, 1);
    }

    #[test]
    fn test_longest_ride_includes_virtual() {
        let activities = vec![
            make_activity(1, "Ride", "2024-05-01T08:00:00Z", 40000.0, 5000),
            make_activity(2, "VirtualRide", "2024-05-02T08:00:00Z", 45000.0, 5000),
            make_activity(3, "GravelRide", "2024-05-03T08:00:00Z", 90000.0, 9000),
        ];

        let months = summarize_by_month(&activities);
        // GravelRide is its own category and is not a ride variant.
        assert_eq!(months[4].longest_ride.as_ref().unwrap().id, 2);
    }

    #[test]
    fn test_avg_ride_watts_is_time_weighted() {
        let activities = vec![
            with_watts(make_activity(1, "Ride", "2024-06-01T08:00:00Z", 1000.0, 100), 200.0),
            with_watts(make_activity(2, "Ride", "2024-06-02T08:00:00Z", 3000.0, 300), 100.0),
        ];

        let months = summarize_by_month(&activities);
        assert_eq!(months[5].avg_ride_watts, Some(125));
    }

    #[test]
    fn test_avg_ride_watts_none_without_power() {
        let activities = vec![make_activity(1, "Ride", "2024-06-01T08:00:00Z", 1000.0, 100)];
        let months = summarize_by_month(&activities);
        assert_eq!(months[5].avg_ride_watts, None);
    }

    #[test]
    fn test_avg_pace_single_run() {
        let activities = vec![make_activity(1, "Run", "2024-07-01T08:00:00Z", 5000.0, 1500)];
        let months = summarize_by_month(&activities);
        assert_eq!(months[6].avg_pace_runs, Some(5.0));
    }

    #[test]
    fn test_avg_pace_is_distance_weighted() {
        // 5 km in 25:00 plus 10 km in 60:00 => 85 min / 15 km
        let activities = vec![
            make_activity(1, "Run", "2024-07-01T08:00:00Z", 5000.0, 1500),
            make_activity(2, "Run", "2024-07-02T08:00:00Z", 10000.0, 3600),
        ];
        let months = summarize_by_month(&activities);
        let pace = months[6].avg_pace_runs.unwrap();
        assert!((pace - 85.0 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_effort_counts_but_does_not_average() {
        let activities = vec![
            make_activity(1, "Run", "2024-08-01T08:00:00Z", 0.0, 600),
            make_activity(2, "Run", "2024-08-02T08:00:00Z", 3000.0, 0),
        ];
        let months = summarize_by_month(&activities);
        let aug = &months[7];

        assert_eq!(aug.totals.count, 2);
        assert_eq!(aug.by_type.get("Run").unwrap().count, 2);
        assert_eq!(aug.avg_pace_runs, None);
        assert_eq!(aug.longest_run.as_ref().unwrap().id, 2);
    }

    #[test]
    fn test_years_merge_by_month_number() {
        let activities = vec![
            make_activity(1, "Run", "2023-09-01T08:00:00Z", 1000.0, 300),
            make_activity(2, "Run", "2024-09-01T08:00:00Z", 1000.0, 300),
        ];
        let months = summarize_by_month(&activities);
        assert_eq!(months[8].totals.count, 2);
    }

    #[test]
    fn test_utc_start_used_without_local_time() {
        let mut late_march = make_activity(1, "Run", "2024-03-31T23:30:00Z", 5000.0, 1500);
        late_march.start_date_local = None;
        // Local wall clock says April; it wins when present.
        let mut local_april = make_activity(2, "Run", "2024-03-31T23:30:00Z", 5000.0, 1500);
        local_april.start_date_local = Some(DateTime::parse_from_rfc3339("2024-04-01T01:30:00+02:00").unwrap());

        let months = summarize_by_month(&[late_march, local_april]);

        assert_eq!(months[2].totals.count, 1);
        assert_eq!(months[2].longest_run.as_ref().unwrap().id, 1);
        assert_eq!(months[3].totals.count, 1);
        assert_eq!(months[3].longest_run.as_ref().unwrap().id, 2);
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let activities = vec![
            with_watts(make_activity(1, "Ride", "2024-10-01T08:00:00Z", 25000.0, 3600), 190.0),
            make_activity(2, "Run", "2024-10-02T08:00:00Z", 8000.0, 2500),
            make_activity(3, "Swim", "2024-11-03T08:00:00Z", 1500.0, 1800),
        ];

        let first = summarize_by_month(&activities);
        let second = summarize_by_month(&activities);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_type_breakdown_serializes_in_insertion_order() {
        let mut breakdown = TypeBreakdown::default();
        breakdown.entry("Walk").count = 1;
        breakdown.entry("Ride").count = 2;
        breakdown.entry("Walk").count += 1;

        let json = serde_json::to_string(&breakdown).unwrap();
        assert!(json.find("\"Walk\"").unwrap() < json.find("\"Ride\"").unwrap());
        assert_eq!(breakdown.get("Walk").unwrap().count, 2);
    }
}
