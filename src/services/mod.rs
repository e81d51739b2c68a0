// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activities;
pub mod cache;
pub mod geo;
pub mod refactor;
pub mod strava;
pub mod windows;

pub use activities::{fetch_all_activities, StravaWindowFetcher, WindowFetcher};
pub use cache::FetchCache;
pub use strava::StravaClient;
pub use windows::{month_windows, CachePolicy, DateWindow};
