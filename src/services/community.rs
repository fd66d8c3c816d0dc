//! Community dashboard: the monthly tank, rankings and athlete summaries.

use crate::db::RecordStore;
use crate::error::{AppError, Result};
use crate::models::activity::round_km;
use crate::models::{ActivityRecord, MonthlyGoal, TankLevel};
use crate::services::streak::{streak_for_records, Streak};
use crate::time_utils::{current_month_bounds, Clock};
use chrono::Datelike;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// One athlete's line in a ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub athlete_id: u64,
    /// Name on the athlete's most recent record
    pub athlete_name: String,
    pub total_km: f64,
    pub activities: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub year: i32,
    pub month: u32,
    pub tank: TankLevel,
    pub ranking: Vec<RankingEntry>,
}

/// Aggregates for one athlete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AthleteSummary {
    pub athlete_id: u64,
    pub total_km: f64,
    pub activities: usize,
    pub month_km: f64,
    pub longest_km: f64,
    /// Fastest recorded pace, `MM:SS`
    pub best_pace: Option<String>,
    pub streak: Streak,
}

/// Fill level of a tank of `goal_km` holding `total_km`.
pub fn tank_level(goal_km: f64, total_km: f64) -> TankLevel {
    let percent = if goal_km > 0.0 {
        ((total_km / goal_km) * 10_000.0).round() / 100.0
    } else {
        100.0
    };

    TankLevel {
        goal_km,
        total_km: round_km(total_km),
        percent: percent.min(100.0),
    }
}

/// Total distance per athlete, largest first.
///
/// Ties keep the athlete with more activities first, then the lower ID.
pub fn ranking(records: &[ActivityRecord]) -> Vec<RankingEntry> {
    let mut by_athlete: HashMap<u64, (RankingEntry, chrono::DateTime<chrono::Utc>)> =
        HashMap::new();

    for record in records {
        let (entry, newest) = by_athlete.entry(record.athlete_id).or_insert_with(|| {
            (
                RankingEntry {
                    athlete_id: record.athlete_id,
                    athlete_name: record.athlete_name.clone(),
                    total_km: 0.0,
                    activities: 0,
                },
                record.timestamp,
            )
        });
        entry.total_km += record.distance_km;
        entry.activities += 1;
        if record.timestamp > *newest {
            *newest = record.timestamp;
            entry.athlete_name = record.athlete_name.clone();
        }
    }

    let mut entries: Vec<RankingEntry> = by_athlete
        .into_values()
        .map(|(mut entry, _)| {
            entry.total_km = round_km(entry.total_km);
            entry
        })
        .collect();

    entries.sort_by(|a, b| {
        b.total_km
            .total_cmp(&a.total_km)
            .then(b.activities.cmp(&a.activities))
            .then(a.athlete_id.cmp(&b.athlete_id))
    });
    entries
}

/// Read side of the community pages.
#[derive(Clone)]
pub struct CommunityBoard {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    default_goal_km: f64,
}

impl CommunityBoard {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, default_goal_km: f64) -> Self {
        Self {
            store,
            clock,
            default_goal_km,
        }
    }

    /// Set the tank size for a month.
    pub async fn set_goal(&self, year: i32, month: u32, goal_km: f64) -> Result<MonthlyGoal> {
        if !(1..=12).contains(&month) {
            return Err(AppError::Validation(format!("month {} out of range", month)));
        }
        if !(goal_km > 0.0 && goal_km < 100_000.0) {
            return Err(AppError::Validation(format!("goal {} km out of range", goal_km)));
        }

        let goal = MonthlyGoal {
            year,
            month,
            goal_km: round_km(goal_km),
        };
        self.store.set_monthly_goal(&goal).await?;
        tracing::info!(year, month, goal_km = goal.goal_km, "Monthly goal set");
        Ok(goal)
    }

    /// Tank and ranking for the current calendar month.
    pub async fn dashboard(&self) -> Result<Dashboard> {
        let now = self.clock.now();
        let (start, end) = current_month_bounds(now);
        let (year, month) = (now.year(), now.month());

        let goal_km = self
            .store
            .get_monthly_goal(year, month)
            .await?
            .map(|goal| goal.goal_km)
            .unwrap_or(self.default_goal_km);

        let records = self.store.activities_between(start, end).await?;
        let total_km: f64 = records.iter().map(|r| r.distance_km).sum();

        Ok(Dashboard {
            year,
            month,
            tank: tank_level(goal_km, total_km),
            ranking: ranking(&records),
        })
    }

    /// All-time ranking.
    pub async fn overall_ranking(&self) -> Result<Vec<RankingEntry>> {
        let now = self.clock.now();
        let start = chrono::DateTime::from_timestamp(0, 0).unwrap_or(now);
        let records = self
            .store
            .activities_between(start, now + chrono::Duration::days(1))
            .await?;
        Ok(ranking(&records))
    }

    /// Totals, records and streak for one athlete.
    pub async fn athlete_summary(&self, athlete_id: u64) -> Result<AthleteSummary> {
        let now = self.clock.now();
        let (month_start, month_end) = current_month_bounds(now);
        let records = self.store.activities_for_athlete(athlete_id).await?;

        let total_km: f64 = records.iter().map(|r| r.distance_km).sum();
        let month_km: f64 = records
            .iter()
            .filter(|r| r.timestamp >= month_start && r.timestamp < month_end)
            .map(|r| r.distance_km)
            .sum();
        let longest_km = records
            .iter()
            .map(|r| r.distance_km)
            .fold(0.0, f64::max);
        let best_pace = records
            .iter()
            .filter_map(|r| r.pace_seconds().map(|secs| (secs, r)))
            .min_by_key(|(secs, _)| *secs)
            .and_then(|(_, r)| r.pace.clone());

        Ok(AthleteSummary {
            athlete_id,
            total_km: round_km(total_km),
            activities: records.len(),
            month_km: round_km(month_km),
            longest_km,
            best_pace,
            streak: streak_for_records(&records, self.clock.today()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityType;
    use chrono::{TimeZone, Utc};

    fn record(athlete_id: u64, name: &str, km: f64, day: u32) -> ActivityRecord {
        ActivityRecord {
            id: format!("{}-{}-{}", athlete_id, day, km),
            athlete_id,
            athlete_name: name.to_string(),
            activity_type: ActivityType::Run,
            distance_km: km,
            pace: None,
            timestamp: Utc.with_ymd_and_hms(2026, 3, day, 7, 0, 0).unwrap(),
            external_id: None,
            avatar_url: None,
            description: None,
            badge: None,
        }
    }

    #[test]
    fn test_tank_level_rounds_and_caps() {
        let level = tank_level(1000.0, 123.456);
        assert_eq!(level.percent, 12.35);
        assert!(!level.is_full());

        let level = tank_level(100.0, 250.0);
        assert_eq!(level.percent, 100.0);
        assert!(level.is_full());
    }

    #[test]
    fn test_ranking_groups_by_id_and_uses_latest_name() {
        let records = vec![
            record(1, "Ana", 5.0, 1),
            record(2, "Caio", 12.0, 2),
            record(1, "Ana Paula", 8.5, 3),
        ];

        let ranking = ranking(&records);

        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].athlete_id, 1);
        assert_eq!(ranking[0].athlete_name, "Ana Paula");
        assert_eq!(ranking[0].total_km, 13.5);
        assert_eq!(ranking[0].activities, 2);
        assert_eq!(ranking[1].athlete_id, 2);
    }

    #[test]
    fn test_same_name_different_athletes_stay_apart() {
        let records = vec![record(1, "Lu", 3.0, 1), record(2, "Lu", 4.0, 1)];
        assert_eq!(ranking(&records).len(), 2);
    }
}
