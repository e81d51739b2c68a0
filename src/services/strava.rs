// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Handles:
//! - Activity listing (optionally bounded by a date window) and updates
//! - Starred segments, segment efforts and segment exploration
//! - OAuth code exchange, token refresh and deauthorization
//! - Rate limit and token error detection

use crate::config::Config;
use crate::error::AppError;
use crate::models::segment::{ExploreResponse, SegmentEffort, StarredSegment};
use crate::models::SummaryActivity;
use crate::services::geo::Bounds;
use serde::{Deserialize, Serialize};

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_base: String,
    oauth_base: String,
    client_id: String,
    client_secret: String,
}

/// Query for `GET /athlete/activities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityListQuery {
    /// Only activities after this epoch second
    pub after: Option<i64>,
    /// Only activities before this epoch second
    pub before: Option<i64>,
    /// 1-indexed page
    pub page: u32,
    pub per_page: u32,
}

/// Fields that can be changed on an activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
}

impl ActivityUpdate {
    /// Build from optional form values, treating blank strings as absent.
    pub fn new(name: Option<&str>, activity_type: Option<&str>) -> Self {
        let clean = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            name: clean(name),
            activity_type: clean(activity_type),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.activity_type.is_none()
    }
}

impl StravaClient {
    /// Create a new Strava client from application config.
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.strava_api_base.trim_end_matches('/').to_string(),
            oauth_base: config.strava_oauth_base.trim_end_matches('/').to_string(),
            client_id: config.strava_client_id.clone(),
            client_secret: config.strava_client_secret.clone(),
        }
    }

    /// URL of the Strava consent screen.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/authorize?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope=activity:read_all,activity:write&\
             state={}",
            self.oauth_base,
            self.client_id,
            urlencoding::encode(redirect_uri),
            state
        )
    }

    /// List one page of the athlete's activities.
    pub async fn list_activities(
        &self,
        access_token: &str,
        query: ActivityListQuery,
    ) -> Result<Vec<SummaryActivity>, AppError> {
        let url = format!("{}/athlete/activities", self.api_base);

        let mut params = vec![
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        if let Some(after) = query.after {
            params.push(("after", after.to_string()));
        }
        if let Some(before) = query.before {
            params.push(("before", before.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Update an activity's name and/or type. An empty update is a no-op.
    pub async fn update_activity(
        &self,
        access_token: &str,
        activity_id: u64,
        update: &ActivityUpdate,
    ) -> Result<(), AppError> {
        if update.is_empty() {
            return Ok(());
        }

        let url = format!("{}/activities/{}", self.api_base, activity_id);

        let response = self
            .http
            .put(&url)
            .bearer_auth(access_token)
            .json(update)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response(response).await
    }

    /// List one page of the athlete's starred segments.
    pub async fn starred_segments(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StarredSegment>, AppError> {
        let url = format!(
            "{}/segments/starred?page={}&per_page={}",
            self.api_base, page, per_page
        );
        self.get_json(&url, access_token).await
    }

    /// List one page of the athlete's efforts on a segment.
    pub async fn segment_efforts(
        &self,
        access_token: &str,
        segment_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SegmentEffort>, AppError> {
        let url = format!(
            "{}/segments/{}/all_efforts?page={}&per_page={}",
            self.api_base, segment_id, page, per_page
        );
        self.get_json(&url, access_token).await
    }

    /// Find popular segments inside `bounds`.
    pub async fn explore_segments(
        &self,
        access_token: &str,
        bounds: &Bounds,
        activity_type: &str,
    ) -> Result<ExploreResponse, AppError> {
        let url = format!("{}/segments/explore", self.api_base);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("bounds", bounds.to_query_value()),
                ("activity_type", activity_type.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Get authenticated athlete profile.
    pub async fn get_athlete(&self, access_token: &str) -> Result<StravaAthlete, AppError> {
        let url = format!("{}/athlete", self.api_base);
        self.get_json(&url, access_token).await
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token exchange failed");
            return Err(AppError::StravaApi(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("Failed to parse token response: {}", e)))
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token refresh request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Revoke the application's access for this athlete.
    pub async fn deauthorize(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}/deauthorize", self.oauth_base))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Deauthorization request failed: {}", e)))?;

        self.check_response(response).await?;
        tracing::info!("Strava deauthorization successful");
        Ok(())
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::error_from_response(response).await)
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }

    async fn error_from_response(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Strava rate limit hit (429)");
            return AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string());
        }

        // Unauthorized - token may be expired or revoked
        if status.as_u16() == 401 {
            return AppError::StravaApi(AppError::STRAVA_TOKEN_ERROR.to_string());
        }

        AppError::StravaApi(format!("HTTP {}: {}", status, body))
    }
}

/// Token exchange response from Strava OAuth (includes athlete info).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub athlete: StravaAthlete,
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Athlete profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StravaAthlete {
    pub id: u64,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}
