//! Strava OAuth credential model.

use crate::time_utils::rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored Strava credential. At most one per athlete; the athlete ID is the
/// document ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCredential {
    /// Strava athlete ID
    pub athlete_id: u64,
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token stops working
    #[serde(with = "rfc3339")]
    pub expires_at: DateTime<Utc>,
    /// First name captured at authorization
    pub athlete_firstname: Option<String>,
    /// Profile picture URL captured at authorization
    pub profile_picture: Option<String>,
}

impl RemoteCredential {
    /// True once the access token must be refreshed before use.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
