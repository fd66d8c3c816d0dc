//! 1v1 challenges: issue, answer, and score against the activity log.

use crate::db::{new_document_id, RecordStore};
use crate::error::{AppError, Result};
use crate::models::activity::round_km;
use crate::models::{ActivityRecord, Challenge, ChallengeStatus, NewChallenge};
use crate::time_utils::Clock;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChallengeVerdict {
    /// Not yet accepted
    NotStarted,
    InProgress,
    Won(u64),
    Draw,
    /// Deadline passed with nobody at the target
    Expired,
    Declined,
}

impl ChallengeVerdict {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ChallengeVerdict::Won(_) | ChallengeVerdict::Draw | ChallengeVerdict::Expired
        )
    }
}

/// Distance each side has logged towards the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeStanding {
    pub challenger_km: f64,
    pub challenged_km: f64,
    pub verdict: ChallengeVerdict,
}

/// Answer a pending challenge on behalf of `athlete_id`.
pub fn respond(
    challenge: &mut Challenge,
    athlete_id: u64,
    accept: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    if challenge.challenged_id != athlete_id {
        return Err(AppError::BadRequest(
            "Only the challenged athlete can respond".to_string(),
        ));
    }
    if challenge.status != ChallengeStatus::Pending {
        return Err(AppError::BadRequest(format!(
            "Challenge is already {:?}",
            challenge.status
        )));
    }

    if accept {
        challenge.status = ChallengeStatus::Active;
        challenge.accepted_at = Some(now);
    } else {
        challenge.status = ChallengeStatus::Declined;
    }
    Ok(())
}

/// Score a challenge from the activity log as of `now`.
///
/// Only activities logged between acceptance and the deadline, of the
/// challenge's type when it has one, count.
pub fn evaluate(
    challenge: &Challenge,
    records: &[ActivityRecord],
    now: DateTime<Utc>,
) -> ChallengeStanding {
    let (Some(start), Some(deadline)) = (challenge.accepted_at, challenge.deadline()) else {
        let verdict = if challenge.status == ChallengeStatus::Declined {
            ChallengeVerdict::Declined
        } else {
            ChallengeVerdict::NotStarted
        };
        return ChallengeStanding {
            challenger_km: 0.0,
            challenged_km: 0.0,
            verdict,
        };
    };

    let km_for = |athlete_id: u64| -> f64 {
        let km: f64 = records
            .iter()
            .filter(|r| r.athlete_id == athlete_id)
            .filter(|r| r.timestamp >= start && r.timestamp < deadline)
            .filter(|r| {
                challenge
                    .activity_type
                    .map_or(true, |kind| kind == r.activity_type)
            })
            .map(|r| r.distance_km)
            .sum();
        round_km(km)
    };

    let challenger_km = km_for(challenge.challenger_id);
    let challenged_km = km_for(challenge.challenged_id);
    let target = challenge.target_km;

    let verdict = match (challenger_km >= target, challenged_km >= target) {
        (true, true) if challenger_km == challenged_km => ChallengeVerdict::Draw,
        (true, true) if challenger_km > challenged_km => {
            ChallengeVerdict::Won(challenge.challenger_id)
        }
        (true, true) => ChallengeVerdict::Won(challenge.challenged_id),
        (true, false) => ChallengeVerdict::Won(challenge.challenger_id),
        (false, true) => ChallengeVerdict::Won(challenge.challenged_id),
        (false, false) if now >= deadline => ChallengeVerdict::Expired,
        (false, false) => ChallengeVerdict::InProgress,
    };

    ChallengeStanding {
        challenger_km,
        challenged_km,
        verdict,
    }
}

/// Challenge arena.
#[derive(Clone)]
pub struct ChallengeService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl ChallengeService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn issue(&self, new: NewChallenge) -> Result<Challenge> {
        new.validate()?;
        if new.challenger_id == new.challenged_id {
            return Err(AppError::BadRequest(
                "Cannot challenge yourself".to_string(),
            ));
        }

        let now = self.clock.now();
        let challenge = Challenge {
            id: new_document_id("challenge", new.challenger_id, now),
            challenger_id: new.challenger_id,
            challenger_name: new.challenger_name.trim().to_string(),
            challenged_id: new.challenged_id,
            challenged_name: new.challenged_name.trim().to_string(),
            target_km: new.target_km,
            activity_type: new.activity_type,
            deadline_days: new.deadline_days,
            status: ChallengeStatus::Pending,
            created_at: now,
            accepted_at: None,
        };
        self.store.insert_challenge(&challenge).await?;

        tracing::info!(
            challenge_id = %challenge.id,
            challenger_id = challenge.challenger_id,
            challenged_id = challenge.challenged_id,
            target_km = challenge.target_km,
            "Challenge issued"
        );
        Ok(challenge)
    }

    pub async fn respond(&self, id: &str, athlete_id: u64, accept: bool) -> Result<Challenge> {
        let mut challenge = self.load(id).await?;
        respond(&mut challenge, athlete_id, accept, self.clock.now())?;
        self.store.update_challenge(&challenge).await?;

        tracing::info!(challenge_id = id, athlete_id, accept, "Challenge answered");
        Ok(challenge)
    }

    /// Score a challenge and persist `Completed` once the result is final.
    pub async fn refresh(&self, id: &str) -> Result<(Challenge, ChallengeStanding)> {
        let mut challenge = self.load(id).await?;
        let now = self.clock.now();

        let mut records = self
            .store
            .activities_for_athlete(challenge.challenger_id)
            .await?;
        records.extend(
            self.store
                .activities_for_athlete(challenge.challenged_id)
                .await?,
        );

        let standing = evaluate(&challenge, &records, now);
        if standing.verdict.is_final() && challenge.status == ChallengeStatus::Active {
            challenge.status = ChallengeStatus::Completed;
            self.store.update_challenge(&challenge).await?;
            tracing::info!(challenge_id = id, verdict = ?standing.verdict, "Challenge completed");
        }

        Ok((challenge, standing))
    }

    pub async fn for_athlete(&self, athlete_id: u64) -> Result<Vec<Challenge>> {
        self.store.challenges_for_athlete(athlete_id).await
    }

    async fn load(&self, id: &str) -> Result<Challenge> {
        self.store
            .get_challenge(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Challenge {}", id)))
    }
}
