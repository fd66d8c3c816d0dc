// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity log model for storage and intake.

use crate::time_utils::{self, rfc3339};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Kind of workout. Walks and hikes are logged as runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Run,
    Ride,
}

impl ActivityType {
    /// Classify a Strava activity type. Only an exact `"Ride"` is a ride.
    pub fn from_strava(kind: Option<&str>) -> Self {
        match kind {
            Some("Ride") => ActivityType::Ride,
            _ => ActivityType::Run,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Run => "run",
            ActivityType::Ride => "ride",
        }
    }
}

/// Stored activity record.
///
/// Created once, either by manual submission or by the Strava sync job.
/// Only `avatar_url`, `description` and `badge` change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Document ID (`strava-{external_id}` for synced activities)
    pub id: String,
    /// Owning athlete
    pub athlete_id: u64,
    /// Display name at the time of logging
    pub athlete_name: String,
    pub activity_type: ActivityType,
    /// Distance in kilometers, two decimals
    pub distance_km: f64,
    /// Pace per km as `MM:SS`
    pub pace: Option<String>,
    /// When the record was created
    #[serde(with = "rfc3339")]
    pub timestamp: DateTime<Utc>,
    /// Strava activity ID; unique across all records when present
    pub external_id: Option<String>,
    pub avatar_url: Option<String>,
    pub description: Option<String>,
    /// Achievement badge, awarded by admins
    pub badge: Option<String>,
}

impl ActivityRecord {
    /// Document ID used for a Strava-sourced record.
    ///
    /// Deriving the ID from the Strava ID lets the store reject a second
    /// insert of the same remote activity.
    pub fn strava_document_id(external_id: &str) -> String {
        format!("strava-{}", external_id)
    }

    /// Calendar day (UTC) the activity counts towards.
    pub fn day(&self) -> NaiveDate {
        time_utils::utc_day(self.timestamp)
    }

    /// Pace in seconds per km, if a valid `MM:SS` pace is recorded.
    pub fn pace_seconds(&self) -> Option<u32> {
        self.pace.as_deref().and_then(parse_pace)
    }
}

/// A manually submitted activity, before it is stored.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewActivity {
    pub athlete_id: u64,
    #[validate(length(min = 1, max = 100))]
    pub athlete_name: String,
    pub activity_type: ActivityType,
    #[validate(range(min = 0.01, max = 999.99))]
    pub distance_km: f64,
    pub pace: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub avatar_url: Option<String>,
}

/// Round a distance to the two decimals the log stores.
pub fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// Format a pace in whole seconds per km as zero-padded `MM:SS`.
pub fn format_pace(seconds_per_km: u64) -> String {
    format!("{:02}:{:02}", seconds_per_km / 60, seconds_per_km % 60)
}

/// Pace for a distance covered in `moving_time_secs`.
///
/// Minutes are floor-divided and seconds truncated, so 5:30.9/km is
/// `05:30`. Returns `None` for a non-positive distance.
pub fn pace_for(moving_time_secs: u64, distance_km: f64) -> Option<String> {
    if distance_km <= 0.0 {
        return None;
    }
    let seconds_per_km = (moving_time_secs as f64 / distance_km).floor();
    if !seconds_per_km.is_finite() {
        return None;
    }
    Some(format_pace(seconds_per_km as u64))
}

/// Parse an `MM:SS` pace into seconds per km.
pub fn parse_pace(pace: &str) -> Option<u32> {
    let (minutes, seconds) = pace.split_once(':')?;
    if minutes.is_empty() || seconds.len() != 2 {
        return None;
    }
    // Digits only; `parse` would also take a sign.
    if !minutes.bytes().chain(seconds.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let minutes: u32 = minutes.parse().ok()?;
    let seconds: u32 = seconds.parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    minutes.checked_mul(60)?.checked_add(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_only_exact_ride() {
        assert_eq!(ActivityType::from_strava(Some("Ride")), ActivityType::Ride);
        assert_eq!(ActivityType::from_strava(Some("VirtualRide")), ActivityType::Run);
        assert_eq!(ActivityType::from_strava(Some("ride")), ActivityType::Run);
        assert_eq!(ActivityType::from_strava(Some("Walk")), ActivityType::Run);
        assert_eq!(ActivityType::from_strava(None), ActivityType::Run);
    }

    #[test]
    fn test_pace_five_thirty() {
        assert_eq!(pace_for(330, 1.0).as_deref(), Some("05:30"));
    }

    #[test]
    fn test_pace_truncates_fractional_seconds() {
        // 1000s over 3km = 333.33s/km
        assert_eq!(pace_for(1000, 3.0).as_deref(), Some("05:33"));
    }

    #[test]
    fn test_pace_zero_distance() {
        assert_eq!(pace_for(600, 0.0), None);
    }

    #[test]
    fn test_pace_over_an_hour_keeps_minutes() {
        assert_eq!(format_pace(3725), "62:05");
    }

    #[test]
    fn test_parse_pace() {
        assert_eq!(parse_pace("05:30"), Some(330));
        assert_eq!(parse_pace("5:30"), Some(330));
        assert_eq!(parse_pace("05:60"), None);
        assert_eq!(parse_pace("05:3"), None);
        assert_eq!(parse_pace("fast"), None);
    }

    #[test]
    fn test_parse_pace_rejects_signs_and_overflow() {
        assert_eq!(parse_pace("+5:+3"), None);
        assert_eq!(parse_pace("+5:30"), None);
        assert_eq!(parse_pace(" 5:30"), None);
        assert_eq!(parse_pace("99999999:00"), None);
        assert_eq!(parse_pace("71582789:00"), None);
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(5.4321), 5.43);
        assert_eq!(round_km(2.999), 3.0);
    }

    #[test]
    fn test_new_activity_validation() {
        let valid = NewActivity {
            athlete_id: 7,
            athlete_name: "Ana".to_string(),
            activity_type: ActivityType::Run,
            distance_km: 5.5,
            pace: None,
            description: None,
            avatar_url: None,
        };
        assert!(valid.validate().is_ok());

        let nameless = NewActivity {
            athlete_name: String::new(),
            ..valid.clone()
        };
        assert!(nameless.validate().is_err());

        let too_far = NewActivity {
            distance_km: 1000.0,
            ..valid
        };
        assert!(too_far.validate().is_err());
    }
}
