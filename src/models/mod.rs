// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod segment;
pub mod summary;

pub use activity::SummaryActivity;
pub use segment::{EffortHistory, ExploreSegment, SegmentEffort, StarredSegment};
pub use summary::{summarize_by_month, MonthSummary, Totals, TypeBreakdown};
