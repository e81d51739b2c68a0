// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and UTC month math.

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// First instant of the UTC calendar month containing `date`.
pub fn start_of_month_utc(date: DateTime<Utc>) -> DateTime<Utc> {
    month_start(date.year(), date.month()).unwrap_or(date)
}

/// First instant of the UTC calendar month after the one containing `date`.
pub fn start_of_next_month_utc(date: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    month_start(year, month).unwrap_or(date)
}

/// Epoch seconds of January 1st, 00:00:00 UTC of `year`.
pub fn start_of_year_utc_epoch(year: i32) -> i64 {
    month_start(year, 1).map(|d| d.timestamp()).unwrap_or(0)
}

/// Epoch seconds of January 1st, 00:00:00 UTC of `year + 1`.
pub fn start_of_next_year_utc_epoch(year: i32) -> i64 {
    start_of_year_utc_epoch(year + 1)
}

fn month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
