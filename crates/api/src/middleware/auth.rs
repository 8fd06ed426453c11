//! Extractors that resolve the calling user from a JWT.

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::Deserialize;
use souschef_core::error::CoreError;
use souschef_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.to_string()))
}

/// Caller identified by `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized("Authorization header is required"))?
        .to_str()
        .map_err(|_| unauthorized("Authorization header is not valid text"))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| unauthorized("Authorization header must use the Bearer scheme"))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let user_id = user_from_token(token, state)?;
        Ok(AuthUser { user_id })
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Caller identified by a `?token=` query parameter.
///
/// Browsers cannot set headers on a WebSocket handshake, so the upgrade
/// route authenticates this way instead.
#[derive(Debug, Clone)]
pub struct WsUser {
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for WsUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.token)
            .filter(|token| !token.is_empty())
        else {
            return Err(unauthorized("token query parameter is required"));
        };

        let user_id = user_from_token(&token, state)?;
        Ok(WsUser { user_id })
    }
}

fn user_from_token(token: &str, state: &AppState) -> Result<DbId, AppError> {
    match validate_token(token, &state.config.jwt) {
        Ok(claims) => Ok(claims.sub),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected access token");
            Err(unauthorized("Invalid or expired token"))
        }
    }
}
