// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod challenge;
pub mod community;
pub mod credential;
pub mod leaderboard;
pub mod reconcile;
pub mod strava;
pub mod streak;

pub use activity::ActivityIntake;
pub use challenge::{ChallengeService, ChallengeStanding, ChallengeVerdict};
pub use community::{AthleteSummary, CommunityBoard, Dashboard, RankingEntry};
pub use credential::CredentialService;
pub use leaderboard::RouteBoard;
pub use reconcile::{NoNewReason, ReconcileReport, Reconciler, SyncOutcome, SyncSummary, TokenState};
pub use strava::{StravaApi, StravaClient};
pub use streak::{compute_streak, ExpiryStatus, Streak};
