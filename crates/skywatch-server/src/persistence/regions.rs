//! Restricted region persistence operations.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

use skywatch_core::models::RestrictedRegion;

use super::{format_ts, parse_ts};

/// Create a new region. The polygon has already been validated by the
/// geometry service; the store keeps the wire form.
pub async fn create_region(
    pool: &SqlitePool,
    name: &str,
    polygon_json: &str,
) -> Result<RestrictedRegion> {
    let created_at = Utc::now();
    let result = sqlx::query(
        "INSERT INTO restricted_regions (name, polygon_json, active, created_at) VALUES (?1, ?2, 1, ?3)",
    )
    .bind(name)
    .bind(polygon_json)
    .bind(format_ts(created_at))
    .execute(pool)
    .await?;

    Ok(RestrictedRegion {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        polygon_json: polygon_json.to_string(),
        active: true,
        created_at,
    })
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<RestrictedRegion>> {
    let rows = sqlx::query_as::<_, RegionRow>("SELECT * FROM restricted_regions ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(RestrictedRegion::from).collect())
}

/// Only active regions participate in containment checks.
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<RestrictedRegion>> {
    let rows = sqlx::query_as::<_, RegionRow>(
        "SELECT * FROM restricted_regions WHERE active = 1 ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(RestrictedRegion::from).collect())
}

/// Flip the active flag. Returns the new state, or None if unknown.
pub async fn toggle(pool: &SqlitePool, id: i64) -> Result<Option<bool>> {
    let result = sqlx::query("UPDATE restricted_regions SET active = NOT active WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let (active,): (bool,) =
        sqlx::query_as("SELECT active FROM restricted_regions WHERE id = ?1")
            .bind(id)
            .fetch_one(pool)
            .await?;

    Ok(Some(active))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM restricted_regions WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct RegionRow {
    id: i64,
    name: String,
    polygon_json: String,
    active: bool,
    created_at: String,
}

impl From<RegionRow> for RestrictedRegion {
    fn from(row: RegionRow) -> Self {
        RestrictedRegion {
            id: row.id,
            name: row.name,
            polygon_json: row.polygon_json,
            active: row.active,
            created_at: parse_ts(&row.created_at),
        }
    }
}
