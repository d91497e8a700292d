//! Database connection and schema setup.
//!
//! Migrations are versioned: `PRAGMA user_version` records how many of
//! the ordered scripts have been applied, and each pending script runs
//! inside one transaction. A migration that fails aborts startup; a
//! half-applied schema is worse than no server.

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Ordered schema scripts. Append-only; never edit an entry that has
/// shipped.
const MIGRATIONS: &[&str] = &[include_str!("../../migrations/001_init.sql")];

/// Database connection wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Open (creating if necessary) the SQLite database and bring its schema
/// up to date.
pub async fn init_database(db_path: &str, max_connections: u32) -> Result<Database> {
    if db_path != ":memory:" {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory for {}", db_path))?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await
        .with_context(|| format!("opening database {}", db_path))?;

    apply_migrations(&pool).await?;

    Ok(Database { pool })
}

async fn apply_migrations(pool: &SqlitePool) -> Result<()> {
    let (applied,): (i64,) = sqlx::query_as("PRAGMA user_version").fetch_one(pool).await?;

    for (index, script) in MIGRATIONS.iter().enumerate().skip(applied as usize) {
        let version = index + 1;
        let mut tx = pool.begin().await?;

        for statement in statements(script) {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("schema migration {} failed", version))?;
        }

        // PRAGMA does not take bind parameters; version is a counter.
        sqlx::query(&format!("PRAGMA user_version = {}", version))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Applied schema migration {}", version);
    }

    Ok(())
}

/// The individual statements of a script. SQLite accepts leading `--`
/// comment lines inside a statement; pieces that are nothing but
/// comments or whitespace are skipped.
fn statements(script: &str) -> impl Iterator<Item = &str> {
    script
        .split(';')
        .map(str::trim)
        .filter(|piece| piece.lines().any(|line| !line.trim().is_empty() && !line.trim().starts_with("--")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_database_has_full_schema() {
        let db = init_database(":memory:", 1).await.unwrap();

        let (version,): (i64,) = sqlx::query_as("PRAGMA user_version")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(version as usize, MIGRATIONS.len());

        for table in ["flights", "alerts", "restricted_regions", "operators"] {
            let (count,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            )
            .bind(table)
            .fetch_one(db.pool())
            .await
            .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[tokio::test]
    async fn reopening_skips_applied_migrations() {
        let path = std::env::temp_dir()
            .join(format!("skywatch-migrate-{}.db", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .to_string();

        let first = init_database(&path, 1).await.unwrap();
        drop(first);

        // Already at the current version; nothing reruns, nothing fails.
        let second = init_database(&path, 1).await.unwrap();
        let (version,): (i64,) = sqlx::query_as("PRAGMA user_version")
            .fetch_one(second.pool())
            .await
            .unwrap();
        assert_eq!(version as usize, MIGRATIONS.len());
    }

    #[test]
    fn comment_only_pieces_are_skipped() {
        let script = "-- header\nCREATE TABLE t (id INTEGER);\n-- trailing note\n";
        let pieces: Vec<&str> = statements(script).collect();
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].contains("CREATE TABLE t"));
    }
}
