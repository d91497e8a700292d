//! Bearer-token authentication for protected endpoints.
//!
//! Token issuance lives in the account handlers; this module validates
//! signature and expiry and extracts the operator's role.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use skywatch_core::models::{Operator, Role};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Operator id
    pub sub: i64,
    pub email: String,
    pub role: String,
    /// Expiration (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Operator context extracted from a validated token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub operator_id: i64,
    pub email: String,
    pub role: Role,
}

/// Role predicate for admin-only operations.
pub fn require_admin(ctx: &AuthContext) -> Result<(), ApiError> {
    if !ctx.role.is_admin() {
        tracing::warn!("Admin required but {} has role '{}'", ctx.email, ctx.role.as_str());
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// Issue a bearer token for an authenticated operator.
pub fn issue_token(
    operator: &Operator,
    secret: &str,
    expiry_hours: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let exp = now + chrono::Duration::hours(expiry_hours as i64);

    let claims = Claims {
        sub: operator.id,
        email: operator.email.clone(),
        role: operator.role.as_str().to_string(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Middleware: validate the bearer token and stash an `AuthContext`.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&req).ok_or(ApiError::Unauthenticated)?;

    let data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthenticated)?;

    let claims = data.claims;
    let role = match claims.role.as_str() {
        "admin" => Role::Admin,
        _ => Role::Analyst,
    };

    req.extensions_mut().insert(AuthContext {
        operator_id: claims.sub,
        email: claims.email,
        role,
    });

    Ok(next.run(req).await)
}

/// Bearer header first; `?token=` as a fallback for WebSocket upgrades,
/// where browser clients cannot set headers.
fn extract_token(req: &Request) -> Option<String> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        if let Ok(text) = value.to_str() {
            if let Some(token) = text.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    req.uri().query().and_then(|query| {
        query.split('&').find_map(|pair| {
            pair.strip_prefix("token=")
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
    })
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}
