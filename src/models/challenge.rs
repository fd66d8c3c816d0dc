//! 1v1 distance challenges between athletes.

use crate::models::ActivityType;
use crate::time_utils::{rfc3339, rfc3339_option};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    /// Waiting for the challenged athlete to answer
    Pending,
    Active,
    Declined,
    Completed,
}

/// A challenge: first to `target_km` within `deadline_days` of acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub challenger_id: u64,
    pub challenger_name: String,
    pub challenged_id: u64,
    pub challenged_name: String,
    pub target_km: f64,
    /// Only activities of this type count; `None` counts both
    pub activity_type: Option<ActivityType>,
    pub deadline_days: u32,
    pub status: ChallengeStatus,
    #[serde(with = "rfc3339")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "rfc3339_option")]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Challenge {
    /// End of the challenge window, once accepted.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.accepted_at
            .map(|start| start + chrono::Duration::days(i64::from(self.deadline_days)))
    }

    pub fn involves(&self, athlete_id: u64) -> bool {
        self.challenger_id == athlete_id || self.challenged_id == athlete_id
    }
}

/// A challenge as issued by the challenger.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewChallenge {
    pub challenger_id: u64,
    #[validate(length(min = 1, max = 100))]
    pub challenger_name: String,
    pub challenged_id: u64,
    #[validate(length(min = 1, max = 100))]
    pub challenged_name: String,
    #[validate(range(min = 0.1, max = 9999.0))]
    pub target_km: f64,
    pub activity_type: Option<ActivityType>,
    #[validate(range(min = 1, max = 90))]
    pub deadline_days: u32,
}
