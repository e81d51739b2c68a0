// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity Dashboard: a Strava activity dashboard and bulk editor
//!
//! This crate provides the backend API that groups an athlete's Strava
//! activities by month, shows starred segment histories, explores nearby
//! segments, and renames or retypes activities in bulk.

pub mod config;
pub mod error;
pub mod format;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{FetchCache, StravaClient};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub strava: StravaClient,
    pub cache: FetchCache,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let strava = StravaClient::new(&config);
        Self {
            config,
            strava,
            cache: FetchCache::new(),
        }
    }
}
