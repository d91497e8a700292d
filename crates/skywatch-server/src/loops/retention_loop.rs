//! Rolling retention sweep.
//!
//! Removes track records past the flight window and resolved alerts past
//! the alert window, in bounded batches so writers are never starved.
//! Unresolved alerts are kept indefinitely.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::interval;

use crate::state::AppState;

const SWEEP_BATCH: i64 = 500;

pub async fn run_retention_loop(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(Duration::from_secs(state.config.retention_sweep_secs));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Retention loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                match sweep_once(&state).await {
                    Ok((flights, alerts)) if flights + alerts > 0 => {
                        tracing::info!("Retention sweep removed {} flight(s), {} alert(s)", flights, alerts);
                    }
                    Ok(_) => {}
                    // Failures are retried on the next tick.
                    Err(err) => tracing::warn!("Retention sweep failed: {}", err),
                }
            }
        }
    }
}

/// One full sweep pass. Returns (flights removed, alerts removed).
pub async fn sweep_once(state: &AppState) -> Result<(u64, u64)> {
    let pool = state.db.pool();
    let now = Utc::now();

    let flight_cutoff = now - chrono::Duration::hours(state.config.flight_retention_hours);
    let mut flights_removed = 0;
    loop {
        let removed =
            crate::persistence::flights::sweep_older_than(pool, flight_cutoff, SWEEP_BATCH).await?;
        flights_removed += removed;
        if removed < SWEEP_BATCH as u64 {
            break;
        }
    }

    let alert_cutoff = now - chrono::Duration::days(state.config.alert_retention_days);
    let mut alerts_removed = 0;
    loop {
        let removed = crate::persistence::alerts::sweep_resolved_older_than(
            pool,
            alert_cutoff,
            SWEEP_BATCH,
        )
        .await?;
        alerts_removed += removed;
        if removed < SWEEP_BATCH as u64 {
            break;
        }
    }

    Ok((flights_removed, alerts_removed))
}
