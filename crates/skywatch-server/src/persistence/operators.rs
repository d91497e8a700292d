//! Operator account persistence operations.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

use skywatch_core::models::{Operator, Role};

use super::{format_ts, parse_ts};

pub async fn create(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<Operator> {
    let created_at = Utc::now();
    let result = sqlx::query(
        "INSERT INTO operators (email, password_hash, role, created_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(format_ts(created_at))
    .execute(pool)
    .await?;

    Ok(Operator {
        id: result.last_insert_rowid(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        role,
        created_at,
    })
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Operator>> {
    let row = sqlx::query_as::<_, OperatorRow>("SELECT * FROM operators WHERE email = ?1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Operator::from))
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Operator>> {
    let row = sqlx::query_as::<_, OperatorRow>("SELECT * FROM operators WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Operator::from))
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM operators")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct OperatorRow {
    id: i64,
    email: String,
    password_hash: String,
    role: String,
    created_at: String,
}

impl From<OperatorRow> for Operator {
    fn from(row: OperatorRow) -> Self {
        let role = match row.role.as_str() {
            "admin" => Role::Admin,
            _ => Role::Analyst,
        };
        Operator {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: parse_ts(&row.created_at),
        }
    }
}
