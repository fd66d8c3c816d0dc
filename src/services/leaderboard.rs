//! Community routes and their time leaderboards.

use crate::db::{new_document_id, RecordStore};
use crate::error::{AppError, Result};
use crate::models::activity::round_km;
use crate::models::{NewRoute, NewRouteTime, Route, RouteTime};
use crate::time_utils::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

/// Best time per athlete, fastest first.
///
/// Equal times rank the earlier post first.
pub fn route_leaderboard(times: &[RouteTime]) -> Vec<RouteTime> {
    let mut best: HashMap<u64, &RouteTime> = HashMap::new();
    for time in times {
        best.entry(time.athlete_id)
            .and_modify(|current| {
                let faster = time.total_seconds() < current.total_seconds();
                let tie_earlier = time.total_seconds() == current.total_seconds()
                    && time.recorded_at < current.recorded_at;
                if faster || tie_earlier {
                    *current = time;
                }
            })
            .or_insert(time);
    }

    let mut board: Vec<RouteTime> = best.into_values().cloned().collect();
    board.sort_by(|a, b| {
        a.total_seconds()
            .cmp(&b.total_seconds())
            .then(a.recorded_at.cmp(&b.recorded_at))
    });
    board
}

#[derive(Clone)]
pub struct RouteBoard {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl RouteBoard {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_route(&self, new: NewRoute) -> Result<Route> {
        new.validate()?;

        let now = self.clock.now();
        let route = Route {
            id: new_document_id("route", new.creator_id, now),
            name: new.name.trim().to_string(),
            creator_id: new.creator_id,
            creator_name: new.creator_name.trim().to_string(),
            estimated_km: round_km(new.estimated_km),
            coordinates: new.coordinates,
            created_at: now,
        };
        self.store.insert_route(&route).await?;

        tracing::info!(route_id = %route.id, creator_id = route.creator_id, "Route created");
        Ok(route)
    }

    pub async fn list_routes(&self) -> Result<Vec<Route>> {
        self.store.list_routes().await
    }

    /// Post a time on an existing route.
    pub async fn post_time(&self, route_id: &str, new: NewRouteTime) -> Result<RouteTime> {
        new.validate()?;
        if new.minutes == 0 && new.seconds == 0 {
            return Err(AppError::Validation("time must be positive".to_string()));
        }
        if self.store.get_route(route_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Route {}", route_id)));
        }

        let now = self.clock.now();
        let time = RouteTime {
            id: new_document_id(route_id, new.athlete_id, now),
            route_id: route_id.to_string(),
            athlete_id: new.athlete_id,
            athlete_name: new.athlete_name.trim().to_string(),
            minutes: new.minutes,
            seconds: new.seconds,
            recorded_at: now,
        };
        self.store.insert_route_time(&time).await?;
        Ok(time)
    }

    pub async fn leaderboard(&self, route_id: &str) -> Result<Vec<RouteTime>> {
        if self.store.get_route(route_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Route {}", route_id)));
        }
        let times = self.store.route_times(route_id).await?;
        Ok(route_leaderboard(&times))
    }

    /// Delete a route and its times. Only the creator may do so.
    pub async fn delete_route(&self, route_id: &str, athlete_id: u64) -> Result<usize> {
        let route = self
            .store
            .get_route(route_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Route {}", route_id)))?;

        if route.creator_id != athlete_id {
            return Err(AppError::BadRequest(
                "Only the creator can delete this route".to_string(),
            ));
        }

        self.store.delete_route(route_id).await
    }
}
