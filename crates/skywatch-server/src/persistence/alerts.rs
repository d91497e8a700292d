//! Alert persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use skywatch_core::models::{Alert, ThreatLevel};

use super::{format_ts, parse_ts};

/// A new alert, before the store has assigned its id.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub flight_id: i64,
    pub transponder_id: Option<String>,
    pub region_id: Option<i64>,
    pub severity: ThreatLevel,
    pub message: String,
    pub threat_reasons: Vec<String>,
    pub recommended_action: String,
}

/// Insert a new unresolved alert. Returns the full record.
pub async fn insert_alert(pool: &SqlitePool, alert: &NewAlert) -> Result<Alert> {
    let created_at = Utc::now();
    let reasons_json = serde_json::to_string(&alert.threat_reasons)?;

    let result = sqlx::query(
        r#"
        INSERT INTO alerts (
            flight_id, transponder_id, region_id, severity, message,
            threat_reasons, recommended_action, resolved, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)
        "#,
    )
    .bind(alert.flight_id)
    .bind(&alert.transponder_id)
    .bind(alert.region_id)
    .bind(alert.severity.as_str())
    .bind(&alert.message)
    .bind(&reasons_json)
    .bind(&alert.recommended_action)
    .bind(format_ts(created_at))
    .execute(pool)
    .await?;

    Ok(Alert {
        id: result.last_insert_rowid(),
        flight_id: alert.flight_id,
        transponder_id: alert.transponder_id.clone(),
        severity: alert.severity,
        message: alert.message.clone(),
        threat_reasons: alert.threat_reasons.clone(),
        recommended_action: alert.recommended_action.clone(),
        resolved: false,
        created_at,
    })
}

/// Recent alerts, newest first, optionally filtered by resolved state.
pub async fn list_recent(
    pool: &SqlitePool,
    resolved: Option<bool>,
    limit: i64,
) -> Result<Vec<Alert>> {
    let rows = match resolved {
        Some(flag) => {
            sqlx::query_as::<_, AlertRow>(
                "SELECT * FROM alerts WHERE resolved = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
            )
            .bind(flag)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, AlertRow>(
                "SELECT * FROM alerts ORDER BY created_at DESC, id DESC LIMIT ?1",
            )
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(|r| r.try_into()).collect()
}

/// Mark an alert resolved. Idempotent: resolving twice is not an error.
///
/// Returns the record after the transition plus whether this call
/// performed it, or None for an unknown id.
pub async fn resolve(pool: &SqlitePool, id: i64) -> Result<Option<(Alert, bool)>> {
    let result = sqlx::query("UPDATE alerts SET resolved = 1 WHERE id = ?1 AND resolved = 0")
        .bind(id)
        .execute(pool)
        .await?;
    let transitioned = result.rows_affected() > 0;

    let row = sqlx::query_as::<_, AlertRow>("SELECT * FROM alerts WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some((row.try_into()?, transitioned))),
        None => Ok(None),
    }
}

/// Unresolved alerts, for rebuilding the deduper on cold start.
pub struct OpenAlertRow {
    pub id: i64,
    pub transponder_id: Option<String>,
    pub region_id: Option<i64>,
    pub severity: ThreatLevel,
}

pub async fn load_unresolved(pool: &SqlitePool) -> Result<Vec<OpenAlertRow>> {
    let rows = sqlx::query_as::<_, (i64, Option<String>, Option<i64>, String)>(
        "SELECT id, transponder_id, region_id, severity FROM alerts WHERE resolved = 0",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, transponder_id, region_id, severity)| OpenAlertRow {
            id,
            transponder_id,
            region_id,
            severity: ThreatLevel::from_label(&severity),
        })
        .collect())
}

/// Delete resolved alerts older than the cutoff, in bounded batches.
/// Unresolved alerts are kept indefinitely.
pub async fn sweep_resolved_older_than(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
    batch: i64,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM alerts WHERE id IN (
            SELECT id FROM alerts WHERE resolved = 1 AND created_at < ?1 LIMIT ?2
        )
        "#,
    )
    .bind(format_ts(cutoff))
    .bind(batch)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct AlertRow {
    id: i64,
    flight_id: i64,
    transponder_id: Option<String>,
    #[allow(dead_code)]
    region_id: Option<i64>,
    severity: String,
    message: String,
    threat_reasons: String,
    recommended_action: String,
    resolved: bool,
    created_at: String,
}

impl TryFrom<AlertRow> for Alert {
    type Error = anyhow::Error;

    fn try_from(row: AlertRow) -> Result<Self> {
        let threat_reasons: Vec<String> = serde_json::from_str(&row.threat_reasons)?;

        Ok(Alert {
            id: row.id,
            flight_id: row.flight_id,
            transponder_id: row.transponder_id,
            severity: ThreatLevel::from_label(&row.severity),
            message: row.message,
            threat_reasons,
            recommended_action: row.recommended_action,
            resolved: row.resolved,
            created_at: parse_ts(&row.created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    fn new_alert(region_id: Option<i64>) -> NewAlert {
        NewAlert {
            flight_id: 1,
            transponder_id: Some("VT-SAL".to_string()),
            region_id,
            severity: ThreatLevel::High,
            message: "Small aircraft detected (ID: VT-SAL)".to_string(),
            threat_reasons: vec![
                "Inside restricted zone".to_string(),
                "Low altitude in zone".to_string(),
            ],
            recommended_action: "Monitor and contact via radio".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_list_and_resolve() {
        let db = init_database(":memory:", 1).await.unwrap();

        let alert = insert_alert(db.pool(), &new_alert(Some(1))).await.unwrap();
        assert!(!alert.resolved);

        let open = list_recent(db.pool(), Some(false), 10).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].threat_reasons.len(), 2);

        let (resolved, transitioned) = resolve(db.pool(), alert.id).await.unwrap().unwrap();
        assert!(resolved.resolved);
        assert!(transitioned);

        // Second resolve is a no-op, not an error.
        let (_, transitioned) = resolve(db.pool(), alert.id).await.unwrap().unwrap();
        assert!(!transitioned);

        assert!(resolve(db.pool(), 9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unresolved_survive_the_sweep() {
        let db = init_database(":memory:", 1).await.unwrap();

        let open = insert_alert(db.pool(), &new_alert(Some(1))).await.unwrap();
        let closed = insert_alert(db.pool(), &new_alert(Some(2))).await.unwrap();
        resolve(db.pool(), closed.id).await.unwrap();

        // Cutoff in the future: everything is "old enough".
        let cutoff = Utc::now() + chrono::Duration::days(1);
        let removed = sweep_resolved_older_than(db.pool(), cutoff, 100).await.unwrap();
        assert_eq!(removed, 1);

        let remaining = list_recent(db.pool(), None, 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, open.id);
    }

    #[tokio::test]
    async fn cold_start_load_returns_open_alerts() {
        let db = init_database(":memory:", 1).await.unwrap();
        insert_alert(db.pool(), &new_alert(Some(3))).await.unwrap();

        let rows = load_unresolved(db.pool()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].region_id, Some(3));
        assert_eq!(rows[0].severity, ThreatLevel::High);
    }
}
