//! REST API routes.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use crate::api::{alerts, auth, operators, regions, telemetry, tracks, ws};
use crate::state::AppState;

/// Assemble the full router for the given state.
pub fn create_router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/auth/register", post(operators::register))
        .route("/v1/auth/login", post(operators::login));

    let protected = Router::new()
        .route("/v1/auth/me", get(operators::me))
        .route("/v1/telemetry", post(telemetry::ingest_telemetry))
        .route("/v1/tracks", get(tracks::list_tracks))
        .route("/v1/tracks/:id", get(tracks::get_track))
        .route("/v1/regions", post(regions::create_region).get(regions::list_regions))
        .route("/v1/regions/active", get(regions::active_regions))
        .route("/v1/regions/:id/toggle", patch(regions::toggle_region))
        .route("/v1/regions/:id", get(regions::get_region).delete(regions::delete_region))
        .route("/v1/alerts", get(alerts::list_alerts))
        .route("/v1/alerts/:id/resolve", post(alerts::resolve_alert))
        .route("/v1/stream", get(ws::ws_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    public.merge(protected).with_state(state)
}
