//! Alert feed and operator acknowledgement.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use skywatch_core::models::{Alert, PushEvent};

use crate::api::auth::AuthContext;
use crate::error::{ApiError, ApiResult};
use crate::persistence::alerts;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    pub resolved: Option<bool>,
    pub limit: Option<i64>,
}

pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    _ctx: AuthContext,
    Query(query): Query<ListAlertsQuery>,
) -> ApiResult<Json<Vec<Alert>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let alerts = alerts::list_recent(state.db.pool(), query.resolved, limit).await?;
    Ok(Json(alerts))
}

/// Operator acknowledgement. Idempotent: re-resolving returns the same
/// record.
pub async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Alert>> {
    let (alert, transitioned) = alerts::resolve(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Alert not found".to_string()))?;

    if transitioned {
        state.dedup.evict_alert(alert.id);
        tracing::info!("Alert {} resolved by {}", alert.id, ctx.email);
        state.bus.publish(&PushEvent::AlertResolved(alert.clone()));
    }

    Ok(Json(alert))
}
