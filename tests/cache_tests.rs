// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fetch cache behavior through the HTTP surface.
//!
//! Cached responses are served without touching Strava, and revalidating a
//! tag only affects the athlete who asked.

use activity_dashboard::routes::segments::efforts_tag;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use tower::ServiceExt;

mod common;

const ATHLETE: u64 = 12345;
const OTHER_ATHLETE: u64 = 67890;

fn seed_efforts(state: &activity_dashboard::AppState, athlete_id: u64, segment_id: u64) {
    let efforts = json!([
        {
            "id": 2,
            "start_date": Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
            "elapsed_time": 240,
            "distance": 1000.0
        },
        {
            "id": 1,
            "start_date": Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            "elapsed_time": 300,
            "distance": 1000.0
        }
    ]);
    state.cache.put_tagged(
        athlete_id,
        &format!("segment-efforts:{}", segment_id),
        &efforts,
        vec![efforts_tag(segment_id)],
        Duration::hours(1),
        Utc::now(),
    );
}

#[tokio::test]
async fn test_cached_efforts_skip_strava() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(ATHLETE, &state.config.session_signing_key);
    seed_efforts(&state, ATHLETE, 42);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/segments/42/efforts")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    // Oldest first
    assert_eq!(body["efforts"][0]["id"], 1);
    assert_eq!(body["efforts"][1]["id"], 2);
    assert_eq!(body["history"]["attempts"], 2);
    assert_eq!(body["history"]["pr_speed_kmh"], 15.0);
}

#[tokio::test]
async fn test_cache_is_per_athlete() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(ATHLETE, &state.config.session_signing_key);
    seed_efforts(&state, OTHER_ATHLETE, 42);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/segments/42/efforts")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Nothing cached for this athlete, so the request goes to Strava.
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_revalidate_tag_drops_entries() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(ATHLETE, &state.config.session_signing_key);
    seed_efforts(&state, ATHLETE, 42);
    seed_efforts(&state, ATHLETE, 43);
    seed_efforts(&state, OTHER_ATHLETE, 42);
    assert_eq!(state.cache.len(), 3);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/cache/revalidate")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"tag": "segment-efforts-42"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["revalidated"], true);
    assert_eq!(body["removed"], 1);

    assert_eq!(state.cache.len(), 2);
    let now = Utc::now();
    assert!(state
        .cache
        .get::<serde_json::Value>(ATHLETE, "segment-efforts:42", now)
        .is_none());
    assert!(state
        .cache
        .get::<serde_json::Value>(OTHER_ATHLETE, "segment-efforts:42", now)
        .is_some());
}

#[tokio::test]
async fn test_signout_clears_athlete_cache() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(ATHLETE, &state.config.session_signing_key);
    seed_efforts(&state, ATHLETE, 42);
    seed_efforts(&state, OTHER_ATHLETE, 42);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/signout")
                .header(header::COOKIE, format!("strava_session={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(state.cache.len(), 1);
}

#[tokio::test]
async fn test_settled_year_served_from_cache() {
    use activity_dashboard::services::{month_windows, CachePolicy};
    use activity_dashboard::time_utils::{start_of_next_year_utc_epoch, start_of_year_utc_epoch};

    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(ATHLETE, &state.config.session_signing_key);
    let now = Utc::now();

    let policy = CachePolicy::Settled {
        tag: "test".to_string(),
        max_age: Duration::hours(1),
    };
    for window in month_windows(start_of_year_utc_epoch(2020), start_of_next_year_utc_epoch(2020)) {
        let activities = if window.start == start_of_year_utc_epoch(2020) {
            json!([
                {
                    "id": 1,
                    "name": "Morning Run",
                    "type": "Run",
                    "sport_type": "Run",
                    "start_date": Utc.with_ymd_and_hms(2020, 1, 15, 8, 0, 0).unwrap(),
                    "distance": 10000.0,
                    "moving_time": 3000
                },
                {
                    "id": 2,
                    "name": "Lunch Ride",
                    "type": "Ride",
                    "start_date": Utc.with_ymd_and_hms(2020, 1, 16, 12, 0, 0).unwrap(),
                    "distance": 30000.0,
                    "moving_time": 3600,
                    "average_watts": 180.0
                }
            ])
        } else {
            json!([])
        };
        let key = format!("activities:{}:{}", window.start, window.end_exclusive);
        state.cache.put(ATHLETE, &key, &activities, &policy, now);
    }

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/activities/2020")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    assert_eq!(body["year"], 2020);
    assert_eq!(body["prev_year"], 2019);
    assert_eq!(body["next_year"], 2021);
    assert_eq!(body["total_activities"], 2);
    assert_eq!(body["months"].as_array().unwrap().len(), 12);

    let january = &body["months"][0];
    assert_eq!(january["count"], 2);
    assert_eq!(january["by_type"][0]["sport_type"], "Ride");
    assert_eq!(january["by_type"][1]["sport_type"], "Run");
    assert_eq!(january["longest_run"]["id"], 1);
    assert_eq!(january["longest_ride"]["id"], 2);
    assert_eq!(january["avg_ride_watts"], 180);
    assert_eq!(body["months"][1]["count"], 0);
}
