//! Idle auto-close for open alerts.
//!
//! A track that stops reporting keeps its alert open forever unless
//! something closes it; this loop resolves alerts whose track has been
//! silent past the configured idle window.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;

use skywatch_core::models::PushEvent;

use crate::persistence::alerts;
use crate::state::AppState;

const IDLE_CHECK_SECS: u64 = 5;

pub async fn run_alert_idle_loop(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(Duration::from_secs(IDLE_CHECK_SECS));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Alert idle loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                close_idle_alerts(&state).await;
            }
        }
    }
}

/// One pass over the open-alert set. Also usable directly from tests.
pub async fn close_idle_alerts(state: &AppState) {
    for alert_id in state.dedup.sweep_idle() {
        match alerts::resolve(state.db.pool(), alert_id).await {
            Ok(Some((alert, transitioned))) => {
                if transitioned {
                    tracing::info!("Alert {} resolved after idle window", alert.id);
                    state.bus.publish(&PushEvent::AlertResolved(alert));
                }
            }
            Ok(None) => tracing::warn!("Idle alert {} missing from store", alert_id),
            Err(err) => tracing::warn!("Failed to resolve idle alert {}: {}", alert_id, err),
        }
    }
}
