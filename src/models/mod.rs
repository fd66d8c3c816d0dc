// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod challenge;
pub mod credential;
pub mod goal;
pub mod route;

pub use activity::{ActivityRecord, ActivityType, NewActivity};
pub use challenge::{Challenge, ChallengeStatus, NewChallenge};
pub use credential::RemoteCredential;
pub use goal::{MonthlyGoal, TankLevel};
pub use route::{NewRoute, NewRouteTime, Route, RouteTime};
