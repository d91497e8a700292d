//! Restricted region CRUD.
//!
//! Mutations are admin-only and swap the server's cached region list so
//! the next telemetry sees the change.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use skywatch_core::geometry::RegionGeometry;
use skywatch_core::models::{CreateRegionRequest, RestrictedRegion};

use crate::api::auth::{require_admin, AuthContext};
use crate::error::{ApiError, ApiResult};
use crate::persistence::regions;
use crate::state::AppState;

pub async fn create_region(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(req): Json<CreateRegionRequest>,
) -> ApiResult<(StatusCode, Json<RestrictedRegion>)> {
    require_admin(&ctx)?;

    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("region name must not be empty".to_string()));
    }
    // Parse up front so a bad polygon never reaches the store.
    RegionGeometry::parse(&req.polygon_json)
        .map_err(|e| ApiError::MalformedGeometry(e.to_string()))?;

    let region = regions::create_region(state.db.pool(), &req.name, &req.polygon_json).await?;
    state.reload_regions().await?;

    tracing::info!("Created restricted region '{}' ({})", region.name, region.id);

    Ok((StatusCode::CREATED, Json(region)))
}

pub async fn list_regions(
    State(state): State<Arc<AppState>>,
    _ctx: AuthContext,
) -> ApiResult<Json<Vec<RestrictedRegion>>> {
    Ok(Json(regions::list_all(state.db.pool()).await?))
}

/// A single region plus the framing hints map clients use.
#[derive(Debug, Serialize)]
pub struct RegionDetail {
    #[serde(flatten)]
    pub region: RestrictedRegion,
    /// Vertex-mean centroid as [lat, lon].
    pub centroid: [f64; 2],
    /// Larger of the lat/lon spans, in degrees.
    pub extent_deg: f64,
}

pub async fn get_region(
    State(state): State<Arc<AppState>>,
    _ctx: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<RegionDetail>> {
    let region = regions::list_all(state.db.pool())
        .await?
        .into_iter()
        .find(|r| r.id == id)
        .ok_or_else(|| ApiError::NotFound("Restricted region not found".to_string()))?;

    let geometry = RegionGeometry::parse(&region.polygon_json)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let (lat, lon, extent_deg) = geometry.centroid_and_extent();

    Ok(Json(RegionDetail {
        region,
        centroid: [lat, lon],
        extent_deg,
    }))
}

pub async fn active_regions(
    State(state): State<Arc<AppState>>,
    _ctx: AuthContext,
) -> ApiResult<Json<Vec<RestrictedRegion>>> {
    Ok(Json(regions::list_active(state.db.pool()).await?))
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub id: i64,
    pub active: bool,
}

pub async fn toggle_region(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<ToggleResponse>> {
    require_admin(&ctx)?;

    let active = regions::toggle(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Restricted region not found".to_string()))?;
    state.reload_regions().await?;

    tracing::info!("Toggled region {} -> active={}", id, active);

    Ok(Json(ToggleResponse { id, active }))
}

pub async fn delete_region(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    require_admin(&ctx)?;

    if !regions::delete(state.db.pool(), id).await? {
        return Err(ApiError::NotFound("Restricted region not found".to_string()));
    }
    state.reload_regions().await?;

    tracing::info!("Deleted restricted region {}", id);

    Ok(StatusCode::NO_CONTENT)
}
