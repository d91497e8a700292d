//! Persistence layer: the store owns all durable rows.

pub mod alerts;
pub mod db;
pub mod flights;
pub mod operators;
pub mod regions;

pub use db::{init_database, Database};

use chrono::{DateTime, SecondsFormat, Utc};
use std::future::Future;

/// Timestamps are stored as fixed-width RFC3339 text so that lexical
/// ordering matches chronological ordering.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Run a store write, retrying once on failure before surfacing the
/// original error.
pub async fn with_retry<T, F, Fut>(op: F) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    match op().await {
        Ok(value) => Ok(value),
        Err(first) => {
            tracing::warn!("Store write failed, retrying once: {}", first);
            match op().await {
                Ok(value) => Ok(value),
                Err(_) => Err(first),
            }
        }
    }
}
