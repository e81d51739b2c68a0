// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory cache for Strava responses.
//!
//! Entries are scoped to one athlete, expire after their max-age, and can be
//! dropped early by tag (e.g. `strava-2025-03` or `segment-efforts-123`).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::services::windows::CachePolicy;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    athlete_id: u64,
    request: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    tags: Vec<String>,
    stored_at: DateTime<Utc>,
    max_age: Duration,
    value: serde_json::Value,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.stored_at + self.max_age
    }
}

/// Shared response cache. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct FetchCache {
    entries: Arc<DashMap<CacheKey, CacheEntry>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `request`, if present, fresh and decodable.
    ///
    /// Expired entries are removed on lookup.
    pub fn get<T: DeserializeOwned>(
        &self,
        athlete_id: u64,
        request: &str,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let key = CacheKey {
            athlete_id,
            request: request.to_string(),
        };

        let value = {
            let entry = self.entries.get(&key)?;
            if entry.is_fresh(now) {
                Some(entry.value.clone())
            } else {
                None
            }
        };

        match value {
            Some(value) => serde_json::from_value(value).ok(),
            None => {
                self.entries.remove(&key);
                None
            }
        }
    }

    /// Store `value` according to `policy`. `Revalidate` never stores.
    pub fn put<T: Serialize>(
        &self,
        athlete_id: u64,
        request: &str,
        value: &T,
        policy: &CachePolicy,
        now: DateTime<Utc>,
    ) {
        let CachePolicy::Settled { tag, max_age } = policy else {
            return;
        };
        self.put_tagged(athlete_id, request, value, vec![tag.clone()], *max_age, now);
    }

    /// Store `value` for `max_age` under the given tags.
    pub fn put_tagged<T: Serialize>(
        &self,
        athlete_id: u64,
        request: &str,
        value: &T,
        tags: Vec<String>,
        max_age: Duration,
        now: DateTime<Utc>,
    ) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, request, "Failed to serialize cache entry");
                return;
            }
        };

        self.entries.insert(
            CacheKey {
                athlete_id,
                request: request.to_string(),
            },
            CacheEntry {
                tags,
                stored_at: now,
                max_age,
                value,
            },
        );
    }

    /// Drop all of the athlete's entries carrying `tag`. Returns how many
    /// entries were removed.
    pub fn revalidate_tag(&self, athlete_id: u64, tag: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key, entry| key.athlete_id != athlete_id || !entry.tags.iter().any(|t| t == tag));
        let removed = before.saturating_sub(self.entries.len());
        tracing::debug!(athlete_id, tag, removed, "Revalidated cache tag");
        removed
    }

    /// Drop every expired entry, whoever it belongs to. Returns how many
    /// entries were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        before.saturating_sub(self.entries.len())
    }

    /// Drop everything cached for an athlete (sign-out).
    pub fn clear_athlete(&self, athlete_id: u64) {
        self.entries.retain(|key, _| key.athlete_id != athlete_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
