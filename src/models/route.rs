//! Community routes and their time leaderboards.

use crate::time_utils::rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A route drawn by an athlete on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub creator_id: u64,
    pub creator_name: String,
    pub estimated_km: f64,
    /// `[lat, lng]` pairs in drawing order
    pub coordinates: Vec<[f64; 2]>,
    #[serde(with = "rfc3339")]
    pub created_at: DateTime<Utc>,
}

/// A route submitted by an athlete.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRoute {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub creator_id: u64,
    #[validate(length(min = 1, max = 100))]
    pub creator_name: String,
    #[validate(range(min = 0.01, max = 999.99))]
    pub estimated_km: f64,
    #[validate(length(min = 2))]
    pub coordinates: Vec<[f64; 2]>,
}

/// A time posted on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTime {
    pub id: String,
    pub route_id: String,
    pub athlete_id: u64,
    pub athlete_name: String,
    pub minutes: u32,
    pub seconds: u32,
    #[serde(with = "rfc3339")]
    pub recorded_at: DateTime<Utc>,
}

impl RouteTime {
    pub fn total_seconds(&self) -> u64 {
        u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }

    /// `MM:SS`, zero-padded.
    pub fn formatted(&self) -> String {
        format!("{:02}:{:02}", self.minutes, self.seconds)
    }
}

/// A time submitted for a route.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRouteTime {
    pub athlete_id: u64,
    #[validate(length(min = 1, max = 100))]
    pub athlete_name: String,
    #[validate(range(max = 999))]
    pub minutes: u32,
    #[validate(range(max = 59))]
    pub seconds: u32,
}
