// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tank_tracker::db::{FirestoreDb, MemoryStore};
use tank_tracker::error::AppError;
use tank_tracker::models::{ActivityRecord, ActivityType, RemoteCredential};
use tank_tracker::services::strava::{
    StravaActivitySummary, StravaApi, StravaAthlete, TokenExchangeResponse, TokenRefreshResponse,
};
use tank_tracker::time_utils::FixedClock;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Generate a unique athlete ID for test isolation.
#[allow(dead_code)]
pub fn unique_athlete_id() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64
}

/// 2026-03-10 08:00:00 UTC
#[allow(dead_code)]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn test_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(test_now()))
}

#[allow(dead_code)]
pub fn test_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// A credential whose token is still valid for an hour.
#[allow(dead_code)]
pub fn fresh_credential(athlete_id: u64) -> RemoteCredential {
    RemoteCredential {
        athlete_id,
        access_token: format!("access-{}", athlete_id),
        refresh_token: format!("refresh-{}", athlete_id),
        expires_at: test_now() + chrono::Duration::hours(1),
        athlete_firstname: Some("Marina".to_string()),
        profile_picture: Some("https://dgalywyr863hv.cloudfront.net/pictures/m.jpg".to_string()),
    }
}

/// A credential whose token expired a minute ago.
#[allow(dead_code)]
pub fn expired_credential(athlete_id: u64) -> RemoteCredential {
    RemoteCredential {
        expires_at: test_now() - chrono::Duration::minutes(1),
        ..fresh_credential(athlete_id)
    }
}

#[allow(dead_code)]
pub fn strava_run(id: u64, distance_m: f64, moving_time: u64) -> StravaActivitySummary {
    StravaActivitySummary {
        id,
        name: "Morning Run".to_string(),
        distance: distance_m,
        moving_time,
        activity_type: Some("Run".to_string()),
    }
}

#[allow(dead_code)]
pub fn manual_record(
    id: &str,
    athlete_id: u64,
    km: f64,
    timestamp: DateTime<Utc>,
    avatar_url: Option<&str>,
) -> ActivityRecord {
    ActivityRecord {
        id: id.to_string(),
        athlete_id,
        athlete_name: "Marina".to_string(),
        activity_type: ActivityType::Run,
        distance_km: km,
        pace: None,
        timestamp,
        external_id: None,
        avatar_url: avatar_url.map(str::to_string),
        description: None,
        badge: None,
    }
}

/// A Strava call seen by [`FakeStrava`].
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StravaCall {
    Exchange(String),
    Refresh(String),
    Latest(String),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<StravaCall>,
    exchange: Option<Result<TokenExchangeResponse, String>>,
    /// Keyed by refresh token
    refresh: HashMap<String, Result<TokenRefreshResponse, String>>,
    /// Keyed by access token
    latest: HashMap<String, Result<Option<StravaActivitySummary>, String>>,
}

/// In-process Strava stand-in that records every call.
///
/// Unconfigured refreshes and fetches fail, so a test only passes if it
/// set up the calls it expects.
#[derive(Default, Clone)]
#[allow(dead_code)]
pub struct FakeStrava {
    state: Arc<Mutex<FakeState>>,
}

#[allow(dead_code)]
impl FakeStrava {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exchange(&self, response: TokenExchangeResponse) -> &Self {
        self.state.lock().unwrap().exchange = Some(Ok(response));
        self
    }

    pub fn with_refresh(
        &self,
        refresh_token: &str,
        access_token: &str,
        expires_in: Option<i64>,
    ) -> &Self {
        self.state.lock().unwrap().refresh.insert(
            refresh_token.to_string(),
            Ok(TokenRefreshResponse {
                access_token: access_token.to_string(),
                refresh_token: format!("{}-next", refresh_token),
                expires_in,
            }),
        );
        self
    }

    pub fn with_refresh_error(&self, refresh_token: &str, message: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .refresh
            .insert(refresh_token.to_string(), Err(message.to_string()));
        self
    }

    pub fn with_latest(&self, access_token: &str, activity: Option<StravaActivitySummary>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .latest
            .insert(access_token.to_string(), Ok(activity));
        self
    }

    pub fn with_latest_error(&self, access_token: &str, message: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .latest
            .insert(access_token.to_string(), Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<StravaCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StravaCall::Refresh(_)))
            .count()
    }
}

#[async_trait]
impl StravaApi for FakeStrava {
    async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StravaCall::Exchange(code.to_string()));
        match state.exchange.clone() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(AppError::StravaApi(message)),
            None => Err(AppError::StravaApi("Bad Request".to_string())),
        }
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StravaCall::Refresh(refresh_token.to_string()));
        match state.refresh.get(refresh_token).cloned() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(AppError::StravaApi(message)),
            None => Err(AppError::StravaApi(AppError::STRAVA_TOKEN_ERROR.to_string())),
        }
    }

    async fn latest_activity(
        &self,
        access_token: &str,
    ) -> Result<Option<StravaActivitySummary>, AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StravaCall::Latest(access_token.to_string()));
        match state.latest.get(access_token).cloned() {
            Some(Ok(activity)) => Ok(activity),
            Some(Err(message)) => Err(AppError::StravaApi(message)),
            None => Err(AppError::StravaApi(AppError::STRAVA_TOKEN_ERROR.to_string())),
        }
    }
}

/// Token exchange response for a newly connecting athlete.
#[allow(dead_code)]
pub fn exchange_response(athlete_id: u64, firstname: Option<&str>) -> TokenExchangeResponse {
    TokenExchangeResponse {
        access_token: "new-access".to_string(),
        refresh_token: "new-refresh".to_string(),
        expires_in: Some(21_600),
        athlete: StravaAthlete {
            id: athlete_id,
            firstname: firstname.map(str::to_string),
            profile: Some("avatar/athlete/large.png".to_string()),
        },
    }
}
