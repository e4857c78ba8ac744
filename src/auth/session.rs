use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::constants::ERR_UNAUTHORIZED;
use crate::error::{AppError, Result};

/// Session verifier handle type
pub type Sessions = Arc<dyn SessionVerifier>;

/// Resolves a browser session access token to a user id
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, access_token: &str) -> Result<Uuid>;
}

/// Supabase Auth (`GET /auth/v1/user`)
#[derive(Clone)]
pub struct SupabaseAuth {
    http: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Deserialize)]
struct AuthUser {
    id: Uuid,
}

impl SupabaseAuth {
    pub fn new(http: Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }
}

#[async_trait]
impl SessionVerifier for SupabaseAuth {
    async fn verify(&self, access_token: &str) -> Result<Uuid> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .bearer_auth(access_token)
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Auth provider unreachable: {e}")))?;

        match response.status() {
            s if s.is_success() => {
                let user: AuthUser = response
                    .json()
                    .await
                    .map_err(|e| AppError::Upstream(format!("Malformed auth response: {e}")))?;
                Ok(user.id)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AppError::unauthorized(ERR_UNAUTHORIZED))
            }
            other => {
                tracing::warn!(status = %other, "Auth provider rejected session lookup");
                Err(AppError::unauthorized(ERR_UNAUTHORIZED))
            }
        }
    }
}

/// Accepts no session at all; used when no auth provider is configured
pub struct DenyAllSessions;

#[async_trait]
impl SessionVerifier for DenyAllSessions {
    async fn verify(&self, _access_token: &str) -> Result<Uuid> {
        Err(AppError::unauthorized(ERR_UNAUTHORIZED))
    }
}
