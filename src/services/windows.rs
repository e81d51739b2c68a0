// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar-month fetch windows.
//!
//! A requested epoch range is split into half-open windows that never cross
//! a UTC month boundary, so each settled month can be cached on its own and
//! only the current month has to be refetched.

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::time_utils::{start_of_month_utc, start_of_next_month_utc};

/// Cache lifetime for months that are entirely in the past (~1 month).
pub const SETTLED_MONTH_MAX_AGE_SECS: i64 = 2_628_000;

/// Prefix for per-month cache tags (`strava-2025-03`).
pub const CACHE_TAG_SOURCE: &str = "strava";

/// Half-open `[start, end_exclusive)` range in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: i64,
    pub end_exclusive: i64,
}

/// How the fetcher may cache a window's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePolicy {
    /// Current month: always refetch.
    Revalidate,
    /// Settled month: cache for `max_age`, invalidated by `tag`.
    Settled { tag: String, max_age: Duration },
}

impl DateWindow {
    /// Whether this window overlaps the UTC month containing `now`.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        let month_start = start_of_month_utc(now).timestamp();
        let next_month_start = start_of_next_month_utc(now).timestamp();
        self.start < next_month_start && self.end_exclusive > month_start
    }

    /// Cache policy for this window relative to `now`.
    pub fn cache_policy(&self, now: DateTime<Utc>) -> CachePolicy {
        if self.is_current(now) {
            return CachePolicy::Revalidate;
        }
        CachePolicy::Settled {
            tag: self.month_tag(),
            max_age: Duration::seconds(SETTLED_MONTH_MAX_AGE_SECS),
        }
    }

    /// `strava-YYYY-MM` for the UTC month this window lies in.
    pub fn month_tag(&self) -> String {
        let start = DateTime::from_timestamp(self.start, 0).unwrap_or_default();
        month_tag(start.year(), start.month())
    }
}

/// Cache tag for a calendar month (`month` is 1-based).
pub fn month_tag(year: i32, month: u32) -> String {
    format!("{}-{}-{:02}", CACHE_TAG_SOURCE, year, month)
}

/// Iterator over month-aligned windows covering `[after, before_exclusive)`.
///
/// Cloning restarts from the clone point.
#[derive(Debug, Clone)]
pub struct MonthWindows {
    cursor: i64,
    end_exclusive: i64,
}

impl Iterator for MonthWindows {
    type Item = DateWindow;

    fn next(&mut self) -> Option<DateWindow> {
        if self.cursor >= self.end_exclusive {
            return None;
        }

        let cursor_date = DateTime::from_timestamp(self.cursor, 0)?;
        let month_start = start_of_month_utc(cursor_date).timestamp();
        let next_month_start = start_of_next_month_utc(cursor_date).timestamp();

        let window = DateWindow {
            start: self.cursor.max(month_start),
            end_exclusive: self.end_exclusive.min(next_month_start),
        };
        self.cursor = window.end_exclusive;
        Some(window)
    }
}

/// Split `[after, before_exclusive)` into UTC-month-aligned windows.
///
/// An empty or inverted range yields no windows.
pub fn month_windows(after: i64, before_exclusive: i64) -> MonthWindows {
    MonthWindows {
        cursor: after,
        end_exclusive: before_exclusive,
    }
}
