// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bulk find / rename / retype over the athlete's activities.
//!
//! Handles:
//! - Search criteria (name substring, inclusive date range)
//! - Retype runs with dry-run preview
//! - Sequential, paced bulk updates with per-activity results

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::SummaryActivity;
use crate::services::strava::{ActivityUpdate, StravaClient};

/// Name and date filter for activity search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Lowercased name fragment
    pub name_contains: Option<String>,
    /// Inclusive lower bound (00:00:00Z of the `from` day)
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound (23:59:59.999Z of the `to` day)
    pub to: Option<DateTime<Utc>>,
}

impl SearchCriteria {
    /// Build from raw query values; blank values are ignored and dates must
    /// be `YYYY-MM-DD`.
    pub fn parse(q: Option<&str>, from: Option<&str>, to: Option<&str>) -> Result<Self> {
        let name_contains = non_blank(q).map(str::to_lowercase);

        let from = non_blank(from)
            .map(|d| parse_day(d, NaiveTime::MIN))
            .transpose()?;
        let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        let to = non_blank(to).map(|d| parse_day(d, end_of_day)).transpose()?;

        Ok(Self {
            name_contains,
            from,
            to,
        })
    }

    /// No criteria at all; searching would return everything.
    pub fn is_empty(&self) -> bool {
        self.name_contains.is_none() && self.from.is_none() && self.to.is_none()
    }

    pub fn matches(&self, activity: &SummaryActivity) -> bool {
        let name_ok = self
            .name_contains
            .as_deref()
            .map_or(true, |q| activity.name.to_lowercase().contains(q));
        let from_ok = self.from.map_or(true, |from| activity.start_date >= from);
        let to_ok = self.to.map_or(true, |to| activity.start_date <= to);
        name_ok && from_ok && to_ok
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_day(value: &str, time: NaiveTime) -> Result<DateTime<Utc>> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|d| d.and_time(time).and_utc())
        .map_err(|_| AppError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", value)))
}

/// Lean search result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRow {
    pub id: u64,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub sport_type: String,
    pub prev_type: String,
}

/// Category as shown in refactor rows; empty when neither field is set.
fn display_type(activity: &SummaryActivity) -> String {
    activity
        .sport_type
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(activity.activity_type.as_deref())
        .unwrap_or_default()
        .to_string()
}

/// Filter `activities` by `criteria`, keeping input order.
pub fn search(criteria: &SearchCriteria, activities: &[SummaryActivity]) -> Vec<SearchRow> {
    activities
        .iter()
        .filter(|a| criteria.matches(a))
        .map(|a| SearchRow {
            id: a.id,
            name: a.name.clone(),
            start_date: a.start_date,
            sport_type: display_type(a),
            prev_type: display_type(a),
        })
        .collect()
}

/// Activities whose name contains `query` (case-insensitive) and whose
/// effective category is not already `target`.
pub fn retype_candidates<'a>(
    activities: &'a [SummaryActivity],
    query: &str,
    target: &str,
) -> Vec<&'a SummaryActivity> {
    let query = query.trim().to_lowercase();
    activities
        .iter()
        .filter(|a| a.name.to_lowercase().contains(&query) && a.category() != target)
        .collect()
}

/// Outcome of one retype row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefactorStatus {
    Updated,
    Skipped,
    Failed,
}

/// Previous vs new type for one activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefactorRow {
    pub id: u64,
    pub name: String,
    pub date: DateTime<Utc>,
    pub prev_type: String,
    pub new_type: String,
    pub status: RefactorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-id result of a bulk update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkResult {
    pub id: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Applies a single activity update.
pub trait ActivityUpdater {
    fn update_activity(
        &self,
        activity_id: u64,
        update: &ActivityUpdate,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Updater that writes to Strava with the caller's token.
pub struct StravaUpdater<'a> {
    pub strava: &'a StravaClient,
    pub access_token: &'a str,
}

impl ActivityUpdater for StravaUpdater<'_> {
    async fn update_activity(&self, activity_id: u64, update: &ActivityUpdate) -> Result<()> {
        self.strava
            .update_activity(self.access_token, activity_id, update)
            .await
    }
}

async fn pace(pacing: Duration, index: usize) {
    if index > 0 && !pacing.is_zero() {
        tokio::time::sleep(pacing).await;
    }
}

/// Retype `candidates` to `target`. A dry run only reports what would
/// change; otherwise updates run one at a time with `pacing` between them.
pub async fn run_retype<U>(
    updater: &U,
    candidates: &[&SummaryActivity],
    target: &str,
    dry_run: bool,
    pacing: Duration,
) -> Vec<RefactorRow>
where
    U: ActivityUpdater + Sync,
{
    let update = ActivityUpdate::new(None, Some(target));
    let mut rows = Vec::with_capacity(candidates.len());

    for (i, activity) in candidates.iter().enumerate() {
        let mut row = RefactorRow {
            id: activity.id,
            name: activity.name.clone(),
            date: activity.start_date,
            prev_type: display_type(activity),
            new_type: target.to_string(),
            status: if dry_run {
                RefactorStatus::Skipped
            } else {
                RefactorStatus::Updated
            },
            error: None,
        };

        if !dry_run {
            pace(pacing, i).await;
            if let Err(e) = updater.update_activity(activity.id, &update).await {
                tracing::warn!(activity_id = activity.id, error = %e, "Retype failed");
                row.status = RefactorStatus::Failed;
                row.error = Some(e.to_string());
            }
        }

        rows.push(row);
    }

    rows
}

/// Apply `update` to each id in order. Zero ids are skipped.
pub async fn bulk_update<U>(
    updater: &U,
    ids: &[u64],
    update: &ActivityUpdate,
    pacing: Duration,
) -> Vec<BulkResult>
where
    U: ActivityUpdater + Sync,
{
    let mut results = Vec::with_capacity(ids.len());

    for &id in ids.iter().filter(|&&id| id != 0) {
        pace(pacing, results.len()).await;
        let result = match updater.update_activity(id, update).await {
            Ok(()) => BulkResult {
                id,
                ok: true,
                error: None,
            },
            Err(e) => {
                tracing::warn!(activity_id = id, error = %e, "Bulk update failed");
                BulkResult {
                    id,
                    ok: false,
                    error: Some(e.to_string()),
                }
            }
        };
        results.push(result);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn activity(id: u64, name: &str, sport_type: &str, start: &str) -> SummaryActivity {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": name,
            "type": "Ride",
            "sport_type": sport_type,
            "start_date": start,
        }))
        .unwrap()
    }

    fn sample() -> Vec<SummaryActivity> {
        vec![
            activity(1, "Morning Commute", "Ride", "2024-05-01T07:00:00Z"),
            activity(2, "Evening commute", "EBikeRide", "2024-05-02T18:00:00Z"),
            activity(3, "Long run", "Run", "2024-05-03T23:59:59Z"),
            activity(4, "COMMUTE home", "Ride", "2024-05-04T00:00:00Z"),
        ]
    }

    #[derive(Default)]
    struct FakeUpdater {
        calls: Mutex<Vec<(u64, ActivityUpdate)>>,
        fail_ids: Vec<u64>,
    }

    impl ActivityUpdater for FakeUpdater {
        async fn update_activity(&self, activity_id: u64, update: &ActivityUpdate) -> Result<()> {
            self.calls.lock().unwrap().push((activity_id, update.clone()));
            if self.fail_ids.contains(&activity_id) {
                return Err(AppError::StravaApi("HTTP 404 Not Found: {}".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_blank_criteria_is_empty() {
        let criteria = SearchCriteria::parse(Some("  "), None, Some("")).unwrap();
        assert!(criteria.is_empty());
    }

    #[test]
    fn test_invalid_date_is_bad_request() {
        let err = SearchCriteria::parse(None, Some("05/01/2024"), None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_search_by_name_is_case_insensitive() {
        let criteria = SearchCriteria::parse(Some("commute"), None, None).unwrap();
        let rows = search(&criteria, &sample());
        let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(rows[1].sport_type, "EBikeRide");
    }

    #[test]
    fn test_date_range_is_inclusive_of_whole_days() {
        let criteria = SearchCriteria::parse(None, Some("2024-05-02"), Some("2024-05-03")).unwrap();
        let ids: Vec<u64> = search(&criteria, &sample()).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_retype_candidates_skip_target_category() {
        let activities = sample();
        let ids: Vec<u64> = retype_candidates(&activities, "Commute", "EBikeRide")
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_updates() {
        let updater = FakeUpdater::default();
        let activities = sample();
        let candidates = retype_candidates(&activities, "commute", "EBikeRide");

        let rows = run_retype(&updater, &candidates, "EBikeRide", true, Duration::ZERO).await;

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.status == RefactorStatus::Skipped));
        assert_eq!(rows[0].prev_type, "Ride");
        assert!(updater.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_reports_failures_and_continues() {
        let updater = FakeUpdater {
            fail_ids: vec![1],
            ..Default::default()
        };
        let activities = sample();
        let candidates = retype_candidates(&activities, "commute", "EBikeRide");

        let rows = run_retype(&updater, &candidates, "EBikeRide", false, Duration::ZERO).await;

        assert_eq!(rows[0].status, RefactorStatus::Failed);
        assert!(rows[0].error.as_deref().unwrap().contains("404"));
        assert_eq!(rows[1].status, RefactorStatus::Updated);

        let calls = updater.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1.activity_type.as_deref(), Some("EBikeRide"));
        assert_eq!(calls[0].1.name, None);
    }

    #[tokio::test]
    async fn test_bulk_update_skips_zero_ids() {
        let updater = FakeUpdater {
            fail_ids: vec![3],
            ..Default::default()
        };
        let update = ActivityUpdate::new(Some("Renamed"), None);

        let results = bulk_update(&updater, &[1, 0, 3], &update, Duration::ZERO).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].ok);
        assert_eq!(results[1].id, 3);
        assert!(!results[1].ok);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RefactorStatus::Updated).unwrap(),
            "\"updated\""
        );
    }
}
