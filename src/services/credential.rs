// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava account connection (OAuth callback handling).

use crate::db::RecordStore;
use crate::error::{AppError, Result};
use crate::models::RemoteCredential;
use crate::services::strava::{authorize_url, StravaApi};
use crate::time_utils::Clock;
use std::sync::Arc;

/// Connects athletes' Strava accounts and stores their credentials.
#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn RecordStore>,
    strava: Arc<dyn StravaApi>,
    clock: Arc<dyn Clock>,
    client_id: String,
    redirect_uri: String,
}

impl CredentialService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        strava: Arc<dyn StravaApi>,
        clock: Arc<dyn Clock>,
        client_id: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            store,
            strava,
            clock,
            client_id,
            redirect_uri,
        }
    }

    /// Where to send an athlete to grant access.
    pub fn authorize_url(&self) -> String {
        authorize_url(&self.client_id, &self.redirect_uri)
    }

    /// Exchange the callback code and store the athlete's credential.
    ///
    /// Reconnecting replaces the previous credential for the same athlete.
    pub async fn connect(&self, code: &str) -> Result<RemoteCredential> {
        if code.trim().is_empty() {
            return Err(AppError::BadRequest("Missing authorization code".to_string()));
        }

        let response = self.strava.exchange_code(code).await.map_err(|e| {
            tracing::error!(error = %e, "Strava token exchange failed");
            e
        })?;

        let now = self.clock.now();
        let credential = RemoteCredential {
            athlete_id: response.athlete.id,
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            expires_at: now + chrono::Duration::seconds(response.expires_in_secs()),
            athlete_firstname: response.athlete.firstname.clone(),
            profile_picture: response.athlete.profile.clone(),
        };

        self.store.upsert_credential(&credential).await?;

        tracing::info!(
            athlete_id = credential.athlete_id,
            firstname = ?credential.athlete_firstname,
            "Strava account connected"
        );
        Ok(credential)
    }
}
