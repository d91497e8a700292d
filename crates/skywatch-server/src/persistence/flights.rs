//! Track record persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use skywatch_core::classifier::Classification;
use skywatch_core::models::{Flight, ThreatLevel, TrajectoryPoint};

use super::{format_ts, parse_ts};

/// Append a track record. Returns the assigned id.
pub async fn insert_flight(pool: &SqlitePool, flight: &Flight) -> Result<i64> {
    let trajectory_json = serde_json::to_string(&flight.predicted_trajectory)?;

    let result = sqlx::query(
        r#"
        INSERT INTO flights (
            transponder_id, timestamp, latitude, longitude, altitude_ft,
            groundspeed_kt, track_deg, classification, threat_level, threat_score,
            detection_confidence, signal_strength, weather_condition,
            in_restricted_area, predicted_trajectory
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&flight.transponder_id)
    .bind(format_ts(flight.timestamp))
    .bind(flight.latitude)
    .bind(flight.longitude)
    .bind(flight.altitude_ft)
    .bind(flight.groundspeed_kt)
    .bind(flight.track_deg)
    .bind(flight.classification.as_str())
    .bind(flight.threat_level.as_str())
    .bind(flight.threat_score as i64)
    .bind(flight.detection_confidence)
    .bind(flight.signal_strength)
    .bind(&flight.weather_condition)
    .bind(flight.in_restricted_area)
    .bind(&trajectory_json)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent insertions, newest first.
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Flight>> {
    let rows = sqlx::query_as::<_, FlightRow>(
        "SELECT * FROM flights ORDER BY timestamp DESC, id DESC LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Flight>> {
    let row = sqlx::query_as::<_, FlightRow>("SELECT * FROM flights WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| r.try_into()).transpose()
}

/// Delete up to `batch` records older than the cutoff. Returns the number
/// removed; callers loop until a short batch comes back so the sweep never
/// holds a long write lock.
pub async fn sweep_older_than(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
    batch: i64,
) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM flights WHERE id IN (SELECT id FROM flights WHERE timestamp < ?1 LIMIT ?2)",
    )
    .bind(format_ts(cutoff))
    .bind(batch)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct FlightRow {
    id: i64,
    transponder_id: Option<String>,
    timestamp: String,
    latitude: f64,
    longitude: f64,
    altitude_ft: f64,
    groundspeed_kt: f64,
    track_deg: f64,
    classification: String,
    threat_level: String,
    threat_score: i64,
    detection_confidence: f64,
    signal_strength: f64,
    weather_condition: String,
    in_restricted_area: bool,
    predicted_trajectory: String,
}

impl TryFrom<FlightRow> for Flight {
    type Error = anyhow::Error;

    fn try_from(row: FlightRow) -> Result<Self> {
        let predicted_trajectory: Vec<TrajectoryPoint> =
            serde_json::from_str(&row.predicted_trajectory)?;

        Ok(Flight {
            id: row.id,
            transponder_id: row.transponder_id,
            timestamp: parse_ts(&row.timestamp),
            latitude: row.latitude,
            longitude: row.longitude,
            altitude_ft: row.altitude_ft,
            groundspeed_kt: row.groundspeed_kt,
            track_deg: row.track_deg,
            classification: Classification::from_label(&row.classification),
            threat_level: ThreatLevel::from_label(&row.threat_level),
            threat_score: row.threat_score.clamp(0, 100) as u8,
            detection_confidence: row.detection_confidence,
            signal_strength: row.signal_strength,
            weather_condition: row.weather_condition,
            in_restricted_area: row.in_restricted_area,
            predicted_trajectory,
        })
    }
}
