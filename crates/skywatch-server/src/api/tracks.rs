//! Track queries for dashboard consumers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use skywatch_core::models::Flight;

use crate::api::auth::AuthContext;
use crate::error::{ApiError, ApiResult};
use crate::persistence::flights;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListTracksQuery {
    pub limit: Option<usize>,
}

/// Latest record per identity, newest first.
pub async fn list_tracks(
    State(state): State<Arc<AppState>>,
    _ctx: AuthContext,
    Query(query): Query<ListTracksQuery>,
) -> Json<Vec<Flight>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Json(state.snapshot(limit))
}

pub async fn get_track(
    State(state): State<Arc<AppState>>,
    _ctx: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Flight>> {
    flights::find_by_id(state.db.pool(), id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Track not found".to_string()))
}
