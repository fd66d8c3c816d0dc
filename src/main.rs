// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tank Tracker sync job
//!
//! Runs one Strava sync pass over every connected athlete and exits.
//! Meant to be triggered on a schedule.

use std::sync::Arc;
use tank_tracker::{
    config::Config,
    db::FirestoreDb,
    services::{Reconciler, StravaClient},
    time_utils::SystemClock,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(project = %config.gcp_project_id, "Starting Tank Tracker sync");

    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    let strava = StravaClient::new(
        config.strava_client_id.clone(),
        config.strava_client_secret.clone(),
        std::time::Duration::from_secs(config.http_timeout_secs),
    )?;

    let reconciler = Reconciler::new(
        Arc::new(db),
        Arc::new(strava),
        Arc::new(SystemClock),
        config.default_avatar_url.clone(),
    );

    let summary = reconciler.sync_all().await?;
    if summary.errors > 0 {
        tracing::warn!(errors = summary.errors, "Sync finished with errors");
    }
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tank_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
