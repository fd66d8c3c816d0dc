// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava sync job.
//!
//! For each stored credential, in order:
//! 1. Refresh the token if expired (one attempt, no retry)
//! 2. Fetch the athlete's newest Strava activity
//! 3. Skip it if its Strava ID is already in the log
//! 4. Convert, filter GPS noise, and append it
//!
//! A failure on one credential never stops the others. A Strava rate
//! limit response ends the pass, since every later call would be refused
//! too.

use crate::db::RecordStore;
use crate::error::Result;
use crate::models::{ActivityRecord, RemoteCredential};
use crate::services::activity::{record_from_strava, AthleteDisplay, FALLBACK_ATHLETE_NAME};
use crate::services::strava::StravaApi;
use crate::time_utils::Clock;
use std::sync::Arc;

/// What happened to the credential's token during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Refreshed,
    Unchanged,
}

/// Why no activity was appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoNewReason {
    /// The newest Strava activity is already in the log
    AlreadyIngested,
    /// The newest Strava activity is too short to count
    TooShort,
    /// The athlete has no Strava activities
    EmptyFeed,
    /// The activity list could not be fetched
    FetchFailed(String),
}

/// Result of reconciling one credential.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    ActivityAppended(ActivityRecord),
    NoNewActivity(NoNewReason),
    /// Token refresh was rejected; the credential is skipped this pass
    RemoteError(String),
    /// Strava answered 429; nothing more can be done this pass
    RateLimited,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    pub athlete_id: u64,
    pub token: TokenState,
    pub outcome: SyncOutcome,
}

/// Totals for one batch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub checked: usize,
    pub refreshed: usize,
    pub appended: usize,
    pub unchanged: usize,
    pub errors: usize,
    /// The pass stopped early on a Strava rate limit
    pub rate_limited: bool,
}

/// Pulls the newest Strava activity for every connected athlete.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    strava: Arc<dyn StravaApi>,
    clock: Arc<dyn Clock>,
    default_avatar_url: String,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        strava: Arc<dyn StravaApi>,
        clock: Arc<dyn Clock>,
        default_avatar_url: String,
    ) -> Self {
        Self {
            store,
            strava,
            clock,
            default_avatar_url,
        }
    }

    /// Run one pass over every stored credential, sequentially.
    ///
    /// Only a failure to list the credentials is returned as an error.
    pub async fn sync_all(&self) -> Result<SyncSummary> {
        let credentials = self.store.list_credentials().await?;
        let mut summary = SyncSummary::default();

        if credentials.is_empty() {
            tracing::warn!("No connected Strava accounts");
            return Ok(summary);
        }

        tracing::info!(count = credentials.len(), "Starting Strava sync");

        for credential in credentials {
            let athlete_id = credential.athlete_id;
            summary.checked += 1;

            let report = match self.reconcile(credential).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(athlete_id, error = %e, "Sync failed, moving on");
                    summary.errors += 1;
                    continue;
                }
            };

            if report.token == TokenState::Refreshed {
                summary.refreshed += 1;
            }
            match report.outcome {
                SyncOutcome::ActivityAppended(_) => summary.appended += 1,
                SyncOutcome::NoNewActivity(_) => summary.unchanged += 1,
                SyncOutcome::RemoteError(_) => summary.errors += 1,
                SyncOutcome::RateLimited => {
                    summary.errors += 1;
                    summary.rate_limited = true;
                    tracing::warn!(athlete_id, "Strava rate limit hit, stopping sync");
                    break;
                }
            }
        }

        tracing::info!(
            checked = summary.checked,
            refreshed = summary.refreshed,
            appended = summary.appended,
            unchanged = summary.unchanged,
            errors = summary.errors,
            rate_limited = summary.rate_limited,
            "Strava sync complete"
        );
        Ok(summary)
    }

    /// Reconcile one credential with Strava.
    ///
    /// Strava failures become outcomes; only store failures are errors.
    pub async fn reconcile(&self, mut credential: RemoteCredential) -> Result<ReconcileReport> {
        let athlete_id = credential.athlete_id;
        let mut token = TokenState::Unchanged;

        // ─── 1. Refresh an expired token ─────────────────────────
        let now = self.clock.now();
        if credential.is_expired(now) {
            tracing::info!(athlete_id, "Access token expired, refreshing");

            let refreshed = match self.strava.refresh_token(&credential.refresh_token).await {
                Ok(r) => r,
                Err(e) => {
                    let outcome = if e.is_rate_limited() {
                        SyncOutcome::RateLimited
                    } else {
                        if e.is_strava_token_error() {
                            tracing::warn!(athlete_id, error = %e, "Refresh token rejected, skipping");
                        } else {
                            tracing::error!(athlete_id, error = %e, "Token refresh failed, skipping");
                        }
                        SyncOutcome::RemoteError(e.to_string())
                    };
                    return Ok(ReconcileReport {
                        athlete_id,
                        token,
                        outcome,
                    });
                }
            };

            credential.access_token = refreshed.access_token.clone();
            credential.refresh_token = refreshed.refresh_token.clone();
            credential.expires_at = now + chrono::Duration::seconds(refreshed.expires_in_secs());
            self.store.upsert_credential(&credential).await?;

            token = TokenState::Refreshed;
            tracing::info!(athlete_id, "Token refreshed");
        }

        let outcome = self.ingest_latest(&credential).await?;
        Ok(ReconcileReport {
            athlete_id,
            token,
            outcome,
        })
    }

    /// Steps 2-4: fetch, dedup, convert, append.
    async fn ingest_latest(&self, credential: &RemoteCredential) -> Result<SyncOutcome> {
        let athlete_id = credential.athlete_id;

        let latest = match self.strava.latest_activity(&credential.access_token).await {
            Ok(Some(activity)) => activity,
            Ok(None) => {
                tracing::debug!(athlete_id, "No Strava activities");
                return Ok(SyncOutcome::NoNewActivity(NoNewReason::EmptyFeed));
            }
            Err(e) if e.is_rate_limited() => return Ok(SyncOutcome::RateLimited),
            Err(e) => {
                if e.is_strava_token_error() {
                    tracing::warn!(athlete_id, error = %e, "Access token rejected by Strava");
                } else {
                    tracing::error!(athlete_id, error = %e, "Could not fetch Strava activities");
                }
                return Ok(SyncOutcome::NoNewActivity(NoNewReason::FetchFailed(
                    e.to_string(),
                )));
            }
        };

        let external_id = latest.id.to_string();
        if self
            .store
            .find_activity_by_external_id(&external_id)
            .await?
            .is_some()
        {
            tracing::debug!(athlete_id, strava_id = latest.id, "Latest activity already logged");
            return Ok(SyncOutcome::NoNewActivity(NoNewReason::AlreadyIngested));
        }

        let display = self.athlete_display(credential).await?;
        let Some(record) = record_from_strava(&latest, &display, self.clock.now()) else {
            tracing::debug!(
                athlete_id,
                strava_id = latest.id,
                distance_m = latest.distance,
                "Discarding activity below distance threshold"
            );
            return Ok(SyncOutcome::NoNewActivity(NoNewReason::TooShort));
        };

        if !self.store.insert_activity(&record).await? {
            // Lost a race with a concurrent insert of the same activity.
            return Ok(SyncOutcome::NoNewActivity(NoNewReason::AlreadyIngested));
        }

        tracing::info!(
            athlete_id,
            strava_id = latest.id,
            name = %latest.name,
            distance_km = record.distance_km,
            "New Strava activity logged"
        );
        Ok(SyncOutcome::ActivityAppended(record))
    }

    /// Name and avatar for a synced record.
    ///
    /// Avatar: Strava profile picture, else the athlete's last used avatar,
    /// else the default image.
    async fn athlete_display(&self, credential: &RemoteCredential) -> Result<AthleteDisplay> {
        let name = credential
            .athlete_firstname
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_ATHLETE_NAME)
            .to_string();

        // Strava sends a relative placeholder path when no picture is set.
        let avatar_url = match credential
            .profile_picture
            .as_deref()
            .filter(|url| url.starts_with("http"))
        {
            Some(url) => url.to_string(),
            None => self
                .store
                .latest_avatar_for_athlete(credential.athlete_id)
                .await?
                .unwrap_or_else(|| self.default_avatar_url.clone()),
        };

        Ok(AthleteDisplay {
            athlete_id: credential.athlete_id,
            name,
            avatar_url,
        })
    }
}
