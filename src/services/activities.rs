// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity fetching across a date range.
//!
//! The range is split into month windows; each window is drained page by
//! page and the results are concatenated in window order, so the aggregator
//! sees activities in the same order no matter which windows were cached.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::SummaryActivity;
use crate::services::cache::FetchCache;
use crate::services::strava::{ActivityListQuery, StravaClient};
use crate::services::windows::{month_windows, CachePolicy, DateWindow};

/// Page size for activity listing. A shorter page is the last one.
pub const PER_PAGE: u32 = 200;

/// Fetch pages starting at 1 until one comes back with fewer than
/// `per_page` items.
pub async fn drain_pages<T, F, Fut>(per_page: u32, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch_page(page).await?;
        let len = batch.len();
        all.extend(batch);
        if len < per_page as usize {
            break;
        }
        page += 1;
    }
    Ok(all)
}

/// Source of activities for one month window.
pub trait WindowFetcher {
    fn fetch_window(
        &self,
        access_token: &str,
        window: DateWindow,
        policy: &CachePolicy,
    ) -> impl Future<Output = Result<Vec<SummaryActivity>>> + Send;
}

/// Fetch every activity in `[after, before_exclusive)`.
///
/// Windows are fetched one at a time; the first failure aborts the whole
/// fetch.
pub async fn fetch_all_activities<F>(
    fetcher: &F,
    access_token: &str,
    after: i64,
    before_exclusive: i64,
    now: DateTime<Utc>,
) -> Result<Vec<SummaryActivity>>
where
    F: WindowFetcher + Sync,
{
    let mut all = Vec::new();

    for window in month_windows(after, before_exclusive) {
        let policy = window.cache_policy(now);
        tracing::debug!(
            window_start = window.start,
            window_end = window.end_exclusive,
            current = matches!(policy, CachePolicy::Revalidate),
            "Fetching activity window"
        );

        let batch = fetcher.fetch_window(access_token, window, &policy).await?;
        all.extend(batch);
    }

    Ok(all)
}

/// Strava-backed window fetcher with per-athlete caching of settled months.
pub struct StravaWindowFetcher<'a> {
    pub strava: &'a StravaClient,
    pub cache: &'a FetchCache,
    pub athlete_id: u64,
    pub now: DateTime<Utc>,
}

impl WindowFetcher for StravaWindowFetcher<'_> {
    async fn fetch_window(
        &self,
        access_token: &str,
        window: DateWindow,
        policy: &CachePolicy,
    ) -> Result<Vec<SummaryActivity>> {
        let key = format!("activities:{}:{}", window.start, window.end_exclusive);

        if let Some(cached) = self.cache.get(self.athlete_id, &key, self.now) {
            tracing::debug!(athlete_id = self.athlete_id, key = %key, "Activity window cache hit");
            return Ok(cached);
        }

        let strava = self.strava;
        let activities = drain_pages(PER_PAGE, move |page| {
            strava.list_activities(
                access_token,
                ActivityListQuery {
                    after: Some(window.start),
                    before: Some(window.end_exclusive - 1),
                    page,
                    per_page: PER_PAGE,
                },
            )
        })
        .await?;

        self.cache
            .put(self.athlete_id, &key, &activities, policy, self.now);
        Ok(activities)
    }
}

/// Fetch the athlete's entire activity history, newest first as Strava
/// returns it, sleeping `pacing` between pages.
pub async fn list_all_activities(
    strava: &StravaClient,
    access_token: &str,
    pacing: Duration,
) -> Result<Vec<SummaryActivity>> {
    drain_pages(PER_PAGE, move |page| async move {
        if page > 1 && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
        strava
            .list_activities(
                access_token,
                ActivityListQuery {
                    after: None,
                    before: None,
                    page,
                    per_page: PER_PAGE,
                },
            )
            .await
    })
    .await
}
