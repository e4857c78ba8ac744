//! Request authentication.
//!
//! Two independent schemes: `x-api-key` for the Home Assistant add-on and
//! `Authorization: Bearer <access token>` for browser sessions. Each is an
//! axum extractor so handlers declare the scheme they accept in their
//! signature.

pub mod api_key;
pub mod session;

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::constants::{ERR_MISSING_API_KEY, ERR_MISSING_AUTHORIZATION};
use crate::error::AppError;
use crate::AppState;

pub use session::{DenyAllSessions, SessionVerifier, Sessions, SupabaseAuth};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Caller authenticated by API key
#[derive(Debug, Clone, Copy)]
pub struct ApiKeyUser(pub Uuid);

/// Caller authenticated by session token
#[derive(Debug, Clone, Copy)]
pub struct SessionUser(pub Uuid);

/// Caller authenticated by either scheme; API key wins when both are sent
#[derive(Debug, Clone, Copy)]
pub struct AnyUser(pub Uuid);

fn api_key_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for ApiKeyUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let key = api_key_header(parts).ok_or_else(|| AppError::unauthorized(ERR_MISSING_API_KEY))?;
        let user_id = api_key::authenticate(&state.db, key).await?;
        Ok(ApiKeyUser(user_id))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| AppError::unauthorized(ERR_MISSING_AUTHORIZATION))?;
        let user_id = state.sessions.verify(token).await?;
        Ok(SessionUser(user_id))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AnyUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(key) = api_key_header(parts) {
            let user_id = api_key::authenticate(&state.db, key).await?;
            return Ok(AnyUser(user_id));
        }
        let token =
            bearer_token(parts).ok_or_else(|| AppError::unauthorized(ERR_MISSING_AUTHORIZATION))?;
        let user_id = state.sessions.verify(token).await?;
        Ok(AnyUser(user_id))
    }
}
