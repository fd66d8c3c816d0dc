//! In-memory record store.
//!
//! Same contract as Firestore, including rejection of duplicate external
//! IDs. Used by tests and for dry runs without a GCP project.

use crate::db::RecordStore;
use crate::error::{AppError, Result};
use crate::models::{ActivityRecord, Challenge, MonthlyGoal, RemoteCredential, Route, RouteTime};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Record store held in process memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    credentials: Arc<DashMap<u64, RemoteCredential>>,
    activities: Arc<DashMap<String, ActivityRecord>>,
    /// external_id -> activity ID
    external_ids: Arc<DashMap<String, String>>,
    goals: Arc<DashMap<String, MonthlyGoal>>,
    routes: Arc<DashMap<String, Route>>,
    route_times: Arc<DashMap<String, RouteTime>>,
    challenges: Arc<DashMap<String, Challenge>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored activity records.
    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }
}

fn newest_first(mut records: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_credentials(&self) -> Result<Vec<RemoteCredential>> {
        let mut credentials: Vec<RemoteCredential> =
            self.credentials.iter().map(|e| e.value().clone()).collect();
        credentials.sort_by_key(|c| c.athlete_id);
        Ok(credentials)
    }

    async fn get_credential(&self, athlete_id: u64) -> Result<Option<RemoteCredential>> {
        Ok(self.credentials.get(&athlete_id).map(|e| e.value().clone()))
    }

    async fn upsert_credential(&self, credential: &RemoteCredential) -> Result<()> {
        self.credentials
            .insert(credential.athlete_id, credential.clone());
        Ok(())
    }

    async fn get_activity(&self, id: &str) -> Result<Option<ActivityRecord>> {
        Ok(self.activities.get(id).map(|e| e.value().clone()))
    }

    async fn find_activity_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ActivityRecord>> {
        let id = match self.external_ids.get(external_id) {
            Some(id) => id.value().clone(),
            None => return Ok(None),
        };
        self.get_activity(&id).await
    }

    async fn insert_activity(&self, record: &ActivityRecord) -> Result<bool> {
        // Reserve the external ID first so concurrent inserts of the same
        // remote activity cannot both pass.
        if let Some(external_id) = &record.external_id {
            match self.external_ids.entry(external_id.clone()) {
                Entry::Occupied(_) => return Ok(false),
                Entry::Vacant(slot) => {
                    slot.insert(record.id.clone());
                }
            }
        }

        match self.activities.entry(record.id.clone()) {
            Entry::Occupied(_) => {
                if let Some(external_id) = &record.external_id {
                    self.external_ids.remove(external_id);
                }
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn update_activity(&self, record: &ActivityRecord) -> Result<()> {
        match self.activities.get_mut(&record.id) {
            Some(mut existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Activity {}", record.id))),
        }
    }

    async fn activities_for_athlete(&self, athlete_id: u64) -> Result<Vec<ActivityRecord>> {
        Ok(newest_first(
            self.activities
                .iter()
                .filter(|e| e.value().athlete_id == athlete_id)
                .map(|e| e.value().clone())
                .collect(),
        ))
    }

    async fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        Ok(newest_first(
            self.activities
                .iter()
                .filter(|e| e.value().timestamp >= start && e.value().timestamp < end)
                .map(|e| e.value().clone())
                .collect(),
        ))
    }

    async fn get_monthly_goal(&self, year: i32, month: u32) -> Result<Option<MonthlyGoal>> {
        Ok(self
            .goals
            .get(&MonthlyGoal::document_id(year, month))
            .map(|e| e.value().clone()))
    }

    async fn set_monthly_goal(&self, goal: &MonthlyGoal) -> Result<()> {
        self.goals
            .insert(MonthlyGoal::document_id(goal.year, goal.month), goal.clone());
        Ok(())
    }

    async fn insert_route(&self, route: &Route) -> Result<()> {
        match self.routes.entry(route.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Duplicate(format!("Route {}", route.id))),
            Entry::Vacant(slot) => {
                slot.insert(route.clone());
                Ok(())
            }
        }
    }

    async fn get_route(&self, id: &str) -> Result<Option<Route>> {
        Ok(self.routes.get(id).map(|e| e.value().clone()))
    }

    async fn list_routes(&self) -> Result<Vec<Route>> {
        let mut routes: Vec<Route> = self.routes.iter().map(|e| e.value().clone()).collect();
        routes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(routes)
    }

    async fn delete_route(&self, id: &str) -> Result<usize> {
        if self.routes.remove(id).is_none() {
            return Ok(0);
        }
        let before = self.route_times.len();
        self.route_times.retain(|_, time| time.route_id != id);
        Ok(1 + before - self.route_times.len())
    }

    async fn insert_route_time(&self, time: &RouteTime) -> Result<()> {
        self.route_times.insert(time.id.clone(), time.clone());
        Ok(())
    }

    async fn route_times(&self, route_id: &str) -> Result<Vec<RouteTime>> {
        Ok(self
            .route_times
            .iter()
            .filter(|e| e.value().route_id == route_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn insert_challenge(&self, challenge: &Challenge) -> Result<()> {
        match self.challenges.entry(challenge.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Duplicate(format!("Challenge {}", challenge.id))),
            Entry::Vacant(slot) => {
                slot.insert(challenge.clone());
                Ok(())
            }
        }
    }

    async fn get_challenge(&self, id: &str) -> Result<Option<Challenge>> {
        Ok(self.challenges.get(id).map(|e| e.value().clone()))
    }

    async fn update_challenge(&self, challenge: &Challenge) -> Result<()> {
        self.challenges
            .insert(challenge.id.clone(), challenge.clone());
        Ok(())
    }

    async fn challenges_for_athlete(&self, athlete_id: u64) -> Result<Vec<Challenge>> {
        let mut challenges: Vec<Challenge> = self
            .challenges
            .iter()
            .filter(|e| e.value().involves(athlete_id))
            .map(|e| e.value().clone())
            .collect();
        challenges.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(challenges)
    }
}
