//! Monthly community goal ("the tank").

use serde::{Deserialize, Serialize};

/// Distance the whole community aims to log in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyGoal {
    pub year: i32,
    /// 1-12
    pub month: u32,
    pub goal_km: f64,
}

impl MonthlyGoal {
    /// Document ID, e.g. `2026-03`.
    pub fn document_id(year: i32, month: u32) -> String {
        format!("{:04}-{:02}", year, month)
    }
}

/// How full the monthly tank is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TankLevel {
    pub goal_km: f64,
    pub total_km: f64,
    /// Percentage of the goal reached, two decimals, capped at 100
    pub percent: f64,
}

impl TankLevel {
    pub fn is_full(&self) -> bool {
        self.percent >= 100.0
    }
}
