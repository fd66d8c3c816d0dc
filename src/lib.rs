// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Tank Tracker: a shared monthly distance goal for a running and cycling group
//!
//! This crate holds the activity log, the streak calculator and the Strava
//! sync job that keeps the log current for every connected athlete.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;
