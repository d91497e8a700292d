//! API routes for the Skywatch server.

pub mod alerts;
pub mod auth;
pub mod operators;
pub mod regions;
mod routes;
pub mod telemetry;
pub mod tracks;
pub mod ws;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub fn routes(state: Arc<AppState>) -> Router {
    routes::create_router(state)
}

#[cfg(test)]
mod tests;
