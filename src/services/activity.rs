// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity intake.
//!
//! Two ways into the log:
//! 1. Manual submission by an athlete
//! 2. Conversion of a Strava activity by the sync job
//!
//! After creation only the display metadata (description, avatar, badge)
//! may change.

use crate::db::{new_document_id, RecordStore};
use crate::error::{AppError, Result};
use crate::models::activity::{format_pace, pace_for, parse_pace, round_km};
use crate::models::{ActivityRecord, ActivityType, NewActivity};
use crate::services::strava::StravaActivitySummary;
use crate::time_utils::Clock;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use validator::Validate;

/// Strava activities at or below this distance are GPS noise.
pub const MIN_SYNC_DISTANCE_KM: f64 = 0.1;

/// Display name used when Strava gives no first name.
pub const FALLBACK_ATHLETE_NAME: &str = "Athlete";

const MAX_DESCRIPTION_LEN: usize = 500;

/// Who a synced activity belongs to and how to show them.
#[derive(Debug, Clone)]
pub struct AthleteDisplay {
    pub athlete_id: u64,
    pub name: String,
    pub avatar_url: String,
}

/// Convert a Strava activity into a log record.
///
/// Returns `None` for activities of [`MIN_SYNC_DISTANCE_KM`] or less.
pub fn record_from_strava(
    activity: &StravaActivitySummary,
    athlete: &AthleteDisplay,
    now: DateTime<Utc>,
) -> Option<ActivityRecord> {
    let distance_km = activity.distance / 1000.0;
    if distance_km <= MIN_SYNC_DISTANCE_KM {
        return None;
    }

    let external_id = activity.id.to_string();
    Some(ActivityRecord {
        id: ActivityRecord::strava_document_id(&external_id),
        athlete_id: athlete.athlete_id,
        athlete_name: athlete.name.clone(),
        activity_type: ActivityType::from_strava(activity.activity_type.as_deref()),
        distance_km: round_km(distance_km),
        // Pace uses the unrounded distance.
        pace: pace_for(activity.moving_time, distance_km),
        timestamp: now,
        external_id: Some(external_id),
        avatar_url: Some(athlete.avatar_url.clone()),
        description: None,
        badge: None,
    })
}

/// Manual activity submission and metadata edits.
#[derive(Clone)]
pub struct ActivityIntake {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl ActivityIntake {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Validate and store a manually logged activity.
    pub async fn submit(&self, new: NewActivity) -> Result<ActivityRecord> {
        new.validate()?;

        let pace = match new.pace.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(pace) => {
                let seconds = parse_pace(pace).ok_or_else(|| {
                    AppError::Validation(format!("pace must be MM:SS, got {:?}", pace))
                })?;
                Some(format_pace(u64::from(seconds)))
            }
        };

        let now = self.clock.now();
        let record = ActivityRecord {
            id: new_document_id("manual", new.athlete_id, now),
            athlete_id: new.athlete_id,
            athlete_name: new.athlete_name.trim().to_string(),
            activity_type: new.activity_type,
            distance_km: round_km(new.distance_km),
            pace,
            timestamp: now,
            external_id: None,
            avatar_url: new.avatar_url,
            description: new.description,
            badge: None,
        };

        if !self.store.insert_activity(&record).await? {
            return Err(AppError::Duplicate(format!("Activity {}", record.id)));
        }

        tracing::info!(
            athlete_id = record.athlete_id,
            activity_id = %record.id,
            distance_km = record.distance_km,
            "Manual activity logged"
        );
        Ok(record)
    }

    /// Replace the description of an activity. Only its owner may do so.
    pub async fn edit_description(
        &self,
        activity_id: &str,
        athlete_id: u64,
        description: Option<String>,
    ) -> Result<ActivityRecord> {
        let mut record = self
            .store
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {}", activity_id)))?;

        if record.athlete_id != athlete_id {
            tracing::warn!(
                activity_id,
                athlete_id,
                owner = record.athlete_id,
                "Blocked description edit by non-owner"
            );
            return Err(AppError::BadRequest(
                "Only the owner can edit this activity".to_string(),
            ));
        }

        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if description
            .as_deref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            return Err(AppError::Validation(format!(
                "description longer than {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }

        record.description = description;
        self.store.update_activity(&record).await?;
        Ok(record)
    }

    /// Set or clear the badge shown on an activity in the feed.
    pub async fn award_badge(&self, activity_id: &str, badge: Option<String>) -> Result<()> {
        let mut record = self
            .store
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {}", activity_id)))?;

        record.badge = badge;
        self.store.update_activity(&record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn athlete() -> AthleteDisplay {
        AthleteDisplay {
            athlete_id: 11,
            name: "Bia".to_string(),
            avatar_url: "https://example.com/bia.png".to_string(),
        }
    }

    fn summary(distance: f64, moving_time: u64, kind: &str) -> StravaActivitySummary {
        StravaActivitySummary {
            id: 555,
            name: "Lunch Run".to_string(),
            distance,
            moving_time,
            activity_type: Some(kind.to_string()),
        }
    }

    #[test]
    fn test_noise_filter() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        assert!(record_from_strava(&summary(80.0, 60, "Run"), &athlete(), now).is_none());
        assert!(record_from_strava(&summary(100.0, 60, "Run"), &athlete(), now).is_none());
        assert!(record_from_strava(&summary(150.0, 60, "Run"), &athlete(), now).is_some());
    }

    #[test]
    fn test_conversion_fields() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let record = record_from_strava(&summary(10_004.0, 3000, "Ride"), &athlete(), now).unwrap();

        assert_eq!(record.id, "strava-555");
        assert_eq!(record.external_id.as_deref(), Some("555"));
        assert_eq!(record.activity_type, ActivityType::Ride);
        assert_eq!(record.distance_km, 10.0);
        // 3000s / 10.004km = 299.88s/km
        assert_eq!(record.pace.as_deref(), Some("04:59"));
        assert_eq!(record.athlete_name, "Bia");
        assert_eq!(record.timestamp, now);
    }
}
