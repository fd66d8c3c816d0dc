// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides the [`RecordStore`] operations for:
//! - Credentials (Strava tokens, keyed by athlete ID)
//! - Activities (the activity log)
//! - Monthly goals, routes, route times, challenges

use crate::db::{collections, RecordStore};
use crate::error::{AppError, Result};
use crate::models::{ActivityRecord, Challenge, MonthlyGoal, RemoteCredential, Route, RouteTime};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use futures_util::future::try_join;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Fetch one document by ID.
    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>>
    where
        T: for<'de> serde::Deserialize<'de> + Send,
    {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace one document.
    async fn set_doc<T>(&self, collection: &str, id: &str, object: &T) -> Result<()>
    where
        T: serde::Serialize + for<'de> serde::Deserialize<'de> + Send + Sync,
    {
        let _: T = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create one document, failing if the ID is taken.
    ///
    /// Returns `Ok(false)` on an ID conflict.
    async fn create_doc<T>(&self, collection: &str, id: &str, object: &T) -> Result<bool>
    where
        T: serde::Serialize + for<'de> serde::Deserialize<'de> + Send + Sync,
    {
        let created: std::result::Result<T, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collection)
            .document_id(id)
            .object(object)
            .execute()
            .await;

        match created {
            Ok(_) => Ok(true),
            Err(FirestoreError::DataConflictError(_)) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete(&self, collection: &str, ids: &[String]) -> Result<()> {
        let client = &self.client;

        for chunk in ids.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for doc_id in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl RecordStore for FirestoreDb {
    // ─── Credential Operations ───────────────────────────────────

    async fn list_credentials(&self) -> Result<Vec<RemoteCredential>> {
        self.client
            .fluent()
            .select()
            .from(collections::CREDENTIALS)
            .order_by([("athlete_id", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_credential(&self, athlete_id: u64) -> Result<Option<RemoteCredential>> {
        self.get_doc(collections::CREDENTIALS, &athlete_id.to_string())
            .await
    }

    async fn upsert_credential(&self, credential: &RemoteCredential) -> Result<()> {
        self.set_doc(
            collections::CREDENTIALS,
            &credential.athlete_id.to_string(),
            credential,
        )
        .await
    }

    // ─── Activity Operations ─────────────────────────────────────

    async fn get_activity(&self, id: &str) -> Result<Option<ActivityRecord>> {
        self.get_doc(collections::ACTIVITIES, id).await
    }

    async fn find_activity_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ActivityRecord>> {
        let found: Vec<ActivityRecord> = self
            .client
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(|q| q.for_all([q.field("external_id").eq(external_id)]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(found.into_iter().next())
    }

    async fn insert_activity(&self, record: &ActivityRecord) -> Result<bool> {
        // Synced records use an ID derived from the Strava ID, so the
        // document-level create conflict is the uniqueness guard.
        let created = self
            .create_doc(collections::ACTIVITIES, &record.id, record)
            .await?;

        if !created {
            tracing::debug!(
                activity_id = %record.id,
                "Activity document already exists (idempotent skip)"
            );
        }
        Ok(created)
    }

    async fn update_activity(&self, record: &ActivityRecord) -> Result<()> {
        if self.get_activity(&record.id).await?.is_none() {
            return Err(AppError::NotFound(format!("Activity {}", record.id)));
        }
        self.set_doc(collections::ACTIVITIES, &record.id, record)
            .await
    }

    async fn activities_for_athlete(&self, athlete_id: u64) -> Result<Vec<ActivityRecord>> {
        self.client
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.for_all([q.field("athlete_id").eq(athlete_id)]))
            .order_by([("timestamp", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        // Timestamps are stored as whole-second RFC3339 strings, which sort
        // in time order.
        let start = format_utc_rfc3339(start);
        let end = format_utc_rfc3339(end);

        self.client
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("timestamp").greater_than_or_equal(start.clone()),
                    q.field("timestamp").less_than(end.clone()),
                ])
            })
            .order_by([("timestamp", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Monthly Goal Operations ─────────────────────────────────

    async fn get_monthly_goal(&self, year: i32, month: u32) -> Result<Option<MonthlyGoal>> {
        self.get_doc(
            collections::MONTHLY_GOALS,
            &MonthlyGoal::document_id(year, month),
        )
        .await
    }

    async fn set_monthly_goal(&self, goal: &MonthlyGoal) -> Result<()> {
        self.set_doc(
            collections::MONTHLY_GOALS,
            &MonthlyGoal::document_id(goal.year, goal.month),
            goal,
        )
        .await
    }

    // ─── Route Operations ────────────────────────────────────────

    async fn insert_route(&self, route: &Route) -> Result<()> {
        if self.create_doc(collections::ROUTES, &route.id, route).await? {
            Ok(())
        } else {
            Err(AppError::Duplicate(format!("Route {}", route.id)))
        }
    }

    async fn get_route(&self, id: &str) -> Result<Option<Route>> {
        self.get_doc(collections::ROUTES, id).await
    }

    async fn list_routes(&self) -> Result<Vec<Route>> {
        self.client
            .fluent()
            .select()
            .from(collections::ROUTES)
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete_route(&self, id: &str) -> Result<usize> {
        if self.get_route(id).await?.is_none() {
            return Ok(0);
        }

        let time_ids: Vec<String> = self
            .route_times(id)
            .await?
            .into_iter()
            .map(|time| time.id)
            .collect();
        self.batch_delete(collections::ROUTE_TIMES, &time_ids)
            .await?;
        tracing::debug!(route_id = id, count = time_ids.len(), "Deleted route times");

        self.client
            .fluent()
            .delete()
            .from(collections::ROUTES)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(route_id = id, "Route deleted");
        Ok(time_ids.len() + 1)
    }

    async fn insert_route_time(&self, time: &RouteTime) -> Result<()> {
        self.set_doc(collections::ROUTE_TIMES, &time.id, time).await
    }

    async fn route_times(&self, route_id: &str) -> Result<Vec<RouteTime>> {
        self.client
            .fluent()
            .select()
            .from(collections::ROUTE_TIMES)
            .filter(|q| q.for_all([q.field("route_id").eq(route_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Challenge Operations ────────────────────────────────────

    async fn insert_challenge(&self, challenge: &Challenge) -> Result<()> {
        if self
            .create_doc(collections::CHALLENGES, &challenge.id, challenge)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::Duplicate(format!("Challenge {}", challenge.id)))
        }
    }

    async fn get_challenge(&self, id: &str) -> Result<Option<Challenge>> {
        self.get_doc(collections::CHALLENGES, id).await
    }

    async fn update_challenge(&self, challenge: &Challenge) -> Result<()> {
        self.set_doc(collections::CHALLENGES, &challenge.id, challenge)
            .await
    }

    async fn challenges_for_athlete(&self, athlete_id: u64) -> Result<Vec<Challenge>> {
        // Firestore has no OR across fields here; query both sides and merge.
        let client = &self.client;
        let side = |field: &'static str| async move {
            client
                .fluent()
                .select()
                .from(collections::CHALLENGES)
                .filter(move |q| q.for_all([q.field(field).eq(athlete_id)]))
                .obj::<Challenge>()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))
        };

        let (issued, received) =
            try_join(side("challenger_id"), side("challenged_id")).await?;
        let mut challenges: Vec<Challenge> = issued.into_iter().chain(received).collect();

        challenges.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        challenges.dedup_by(|a, b| a.id == b.id);
        Ok(challenges)
    }
}
