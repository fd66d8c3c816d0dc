//! Activity streaks.
//!
//! A streak is a chain of activity days where no gap between neighbours
//! exceeds [`STREAK_GRACE_DAYS`]. It is alive while the newest activity is
//! at most that many days old.
//!
//! The expiry countdown is measured from the newest activity only, not from
//! the chain; the two only disagree when the chain is already broken.

use crate::models::ActivityRecord;
use chrono::NaiveDate;
use serde::Serialize;

/// Longest gap, in days, that keeps a streak alive.
pub const STREAK_GRACE_DAYS: i64 = 3;

/// Streak state for one athlete on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Streak {
    /// Days in the current chain; 0 when broken or empty
    pub count: u32,
    /// `STREAK_GRACE_DAYS - days since newest activity`; `None` with no history
    pub days_until_expiry: Option<i64>,
}

/// How close a streak is to expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExpiryStatus {
    NoActivity,
    Expired,
    ExpiresToday,
    ExpiresTomorrow,
    SafeFor(i64),
}

impl Streak {
    pub fn expiry_status(&self) -> ExpiryStatus {
        match self.days_until_expiry {
            None => ExpiryStatus::NoActivity,
            Some(days) if days < 0 => ExpiryStatus::Expired,
            Some(0) => ExpiryStatus::ExpiresToday,
            Some(1) => ExpiryStatus::ExpiresTomorrow,
            Some(days) => ExpiryStatus::SafeFor(days),
        }
    }
}

/// Compute the streak from activity days as of `today`.
///
/// `dates` may be in any order and contain repeats; each calendar day
/// counts once. Days after `today` are treated as `today`.
pub fn compute_streak(dates: &[NaiveDate], today: NaiveDate) -> Streak {
    let mut days: Vec<NaiveDate> = dates.iter().map(|d| (*d).min(today)).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some(&newest) = days.first() else {
        return Streak {
            count: 0,
            days_until_expiry: None,
        };
    };

    let gap = (today - newest).num_days();
    let days_until_expiry = Some(STREAK_GRACE_DAYS - gap);

    if gap > STREAK_GRACE_DAYS {
        return Streak {
            count: 0,
            days_until_expiry,
        };
    }

    let mut count = 1;
    for pair in days.windows(2) {
        if (pair[0] - pair[1]).num_days() > STREAK_GRACE_DAYS {
            break;
        }
        count += 1;
    }

    Streak {
        count,
        days_until_expiry,
    }
}

/// Compute the streak for one athlete's records.
pub fn streak_for_records(records: &[ActivityRecord], today: NaiveDate) -> Streak {
    let dates: Vec<NaiveDate> = records.iter().map(ActivityRecord::day).collect();
    compute_streak(&dates, today)
}
