//! Database layer.
//!
//! [`RecordStore`] is the contract the services depend on. [`FirestoreDb`]
//! backs production; [`MemoryStore`] backs tests and local runs.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{ActivityRecord, Challenge, MonthlyGoal, RemoteCredential, Route, RouteTime};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// ID for a locally created document: `{prefix}-{owner}-{micros}-{seq}`.
///
/// The sequence is per process, so IDs stay distinct when the clock does
/// not move between writes.
pub fn new_document_id(prefix: &str, owner: u64, now: DateTime<Utc>) -> String {
    let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}-{}", prefix, owner, now.timestamp_micros(), seq)
}

/// Collection names as constants.
pub mod collections {
    pub const CREDENTIALS: &str = "credentials";
    pub const ACTIVITIES: &str = "activities";
    pub const MONTHLY_GOALS: &str = "monthly_goals";
    pub const ROUTES: &str = "routes";
    pub const ROUTE_TIMES: &str = "route_times";
    pub const CHALLENGES: &str = "challenges";
}

/// Persistent record store.
///
/// Each call is independent; there is no transaction spanning calls. The
/// only concurrency guard is that [`RecordStore::insert_activity`] never
/// stores two records with the same ID or the same `external_id`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ─── Credentials ─────────────────────────────────────────────

    async fn list_credentials(&self) -> Result<Vec<RemoteCredential>>;

    async fn get_credential(&self, athlete_id: u64) -> Result<Option<RemoteCredential>>;

    /// Create or replace the credential for `credential.athlete_id`.
    async fn upsert_credential(&self, credential: &RemoteCredential) -> Result<()>;

    // ─── Activities ──────────────────────────────────────────────

    async fn get_activity(&self, id: &str) -> Result<Option<ActivityRecord>>;

    async fn find_activity_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ActivityRecord>>;

    /// Store a new record.
    ///
    /// Returns `false` without writing if the ID or external ID is taken.
    async fn insert_activity(&self, record: &ActivityRecord) -> Result<bool>;

    /// Overwrite an existing record (display metadata edits).
    async fn update_activity(&self, record: &ActivityRecord) -> Result<()>;

    /// All records for one athlete, newest first.
    async fn activities_for_athlete(&self, athlete_id: u64) -> Result<Vec<ActivityRecord>>;

    /// Records with `start <= timestamp < end`, newest first.
    async fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>>;

    /// Avatar of the athlete's most recent record that has one.
    async fn latest_avatar_for_athlete(&self, athlete_id: u64) -> Result<Option<String>> {
        Ok(self
            .activities_for_athlete(athlete_id)
            .await?
            .into_iter()
            .find_map(|record| record.avatar_url))
    }

    // ─── Monthly Goals ───────────────────────────────────────────

    async fn get_monthly_goal(&self, year: i32, month: u32) -> Result<Option<MonthlyGoal>>;

    async fn set_monthly_goal(&self, goal: &MonthlyGoal) -> Result<()>;

    // ─── Routes ──────────────────────────────────────────────────

    async fn insert_route(&self, route: &Route) -> Result<()>;

    async fn get_route(&self, id: &str) -> Result<Option<Route>>;

    /// All routes, newest first.
    async fn list_routes(&self) -> Result<Vec<Route>>;

    /// Delete a route and every time posted on it.
    ///
    /// Returns the number of documents deleted.
    async fn delete_route(&self, id: &str) -> Result<usize>;

    async fn insert_route_time(&self, time: &RouteTime) -> Result<()>;

    async fn route_times(&self, route_id: &str) -> Result<Vec<RouteTime>>;

    // ─── Challenges ──────────────────────────────────────────────

    async fn insert_challenge(&self, challenge: &Challenge) -> Result<()>;

    async fn get_challenge(&self, id: &str) -> Result<Option<Challenge>>;

    async fn update_challenge(&self, challenge: &Challenge) -> Result<()>;

    /// Challenges where the athlete is either side, newest first.
    async fn challenges_for_athlete(&self, athlete_id: u64) -> Result<Vec<Challenge>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_document_ids_differ_at_same_instant() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap();
        let first = new_document_id("manual", 1, now);
        let second = new_document_id("manual", 1, now);

        assert_ne!(first, second);
        assert!(first.starts_with("manual-1-1773129600000000-"));
    }
}
