// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Handles:
//! - Authorization URL and code exchange
//! - Token refresh when expired
//! - Fetching the newest activity
//! - Rate limit / bad token detection

use crate::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const API_BASE_URL: &str = "https://www.strava.com/api/v3";
const OAUTH_BASE_URL: &str = "https://www.strava.com/oauth";

/// Lifetime Strava grants an access token when it does not say (6 hours).
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 21_600;

/// Scopes requested at authorization.
pub const OAUTH_SCOPE: &str = "read,activity:read_all";

/// The Strava operations the sync job depends on.
#[async_trait]
pub trait StravaApi: Send + Sync {
    /// Exchange an authorization code for tokens and the athlete profile.
    async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError>;

    /// Trade a refresh token for a new token pair.
    async fn refresh_token(&self, refresh_token: &str)
        -> Result<TokenRefreshResponse, AppError>;

    /// Newest activity of the token's athlete, if any.
    async fn latest_activity(
        &self,
        access_token: &str,
    ) -> Result<Option<StravaActivitySummary>, AppError>;
}

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(
        client_id: String,
        client_secret: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: API_BASE_URL.to_string(),
            oauth_url: OAUTH_BASE_URL.to_string(),
            client_id,
            client_secret,
        })
    }

    /// List activities, newest first (paginated).
    pub async fn list_activities(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>, AppError> {
        let url = format!("{}/athlete/activities", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("page", page.to_string()), ("per_page", per_page.to_string())])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// POST to the token endpoint with the given grant.
    async fn token_request<T: for<'de> Deserialize<'de>>(
        &self,
        grant: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Strava rate limit hit (429)");
                return Err(AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string()));
            }

            if status.as_u16() == 401 {
                return Err(AppError::StravaApi(
                    AppError::STRAVA_TOKEN_ERROR.to_string(),
                ));
            }

            return Err(AppError::StravaApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl StravaApi for StravaClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError> {
        self.token_request(&[("code", code), ("grant_type", "authorization_code")])
            .await
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        self.token_request(&[
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn latest_activity(
        &self,
        access_token: &str,
    ) -> Result<Option<StravaActivitySummary>, AppError> {
        let activities = self.list_activities(access_token, 1, 1).await?;
        Ok(activities.into_iter().next())
    }
}

/// Build the Strava consent page URL.
pub fn authorize_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}/authorize?client_id={}&response_type=code&redirect_uri={}&approval_prompt=force&scope={}",
        OAUTH_BASE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(OAUTH_SCOPE),
    )
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the new access token expires
    pub expires_in: Option<i64>,
}

impl TokenRefreshResponse {
    pub fn expires_in_secs(&self) -> i64 {
        self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS)
    }
}

/// Token exchange response from Strava OAuth (includes athlete info).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<i64>,
    pub athlete: StravaAthlete,
}

impl TokenExchangeResponse {
    pub fn expires_in_secs(&self) -> i64 {
        self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS)
    }
}

/// Athlete info from OAuth token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    pub id: u64,
    pub firstname: Option<String>,
    /// Profile picture URL
    pub profile: Option<String>,
}

/// Summary activity for list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivitySummary {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Meters
    pub distance: f64,
    /// Seconds
    pub moving_time: u64,
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
}
