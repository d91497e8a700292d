//! Operator account endpoints: register, login, current identity.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use skywatch_core::models::Role;

use crate::api::auth::{issue_token, AuthContext};
use crate::error::{ApiError, ApiResult};
use crate::persistence::operators;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct OperatorInfo {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub role: Role,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<OperatorInfo>)> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(ApiError::Validation("email is not valid".to_string()));
    }

    if operators::find_by_email(state.db.pool(), &req.email).await?.is_some() {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let role = req.role.unwrap_or(Role::Analyst);
    let operator = operators::create(state.db.pool(), &req.email, &password_hash, role).await?;

    tracing::info!("Registered operator {} ({})", operator.email, role.as_str());

    Ok((
        StatusCode::CREATED,
        Json(OperatorInfo {
            id: operator.id,
            email: operator.email,
            role: operator.role,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let operator = operators::find_by_email(state.db.pool(), &req.email)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    verify_password(&req.password, &operator.password_hash)?;

    let token = issue_token(
        &operator,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(TokenResponse {
        token,
        role: operator.role,
    }))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> ApiResult<Json<OperatorInfo>> {
    let operator = operators::find_by_id(state.db.pool(), ctx.operator_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Operator not found".to_string()))?;

    Ok(Json(OperatorInfo {
        id: operator.id,
        email: operator.email,
        role: operator.role,
    }))
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<(), ApiError> {
    let parsed = PasswordHash::new(hash).map_err(|e| ApiError::Internal(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ApiError::Unauthenticated)
}
