use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{api_key, SessionUser};
use crate::error::Result;
use crate::models::ApiKey;
use crate::routes::validation::{require_text, require_uuid, ValidJson};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateKeyRequest {
    pub name: Option<String>,
}

/// The plaintext key appears here and nowhere else
#[derive(Debug, Serialize)]
pub struct GenerateKeyResponse {
    pub success: bool,
    pub api_key: String,
    pub key_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyListResponse {
    pub keys: Vec<ApiKey>,
}

#[derive(Debug, Deserialize)]
pub struct RevokeKeyRequest {
    pub key_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RevokeKeyResponse {
    pub success: bool,
}

pub async fn generate_key(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    ValidJson(payload): ValidJson<GenerateKeyRequest>,
) -> Result<Json<GenerateKeyResponse>> {
    let name = require_text("name", payload.name.as_deref())?;
    let issued = api_key::issue(&state.db, user_id, &name).await?;

    Ok(Json(GenerateKeyResponse {
        success: true,
        api_key: issued.key,
        key_id: issued.record.id,
        name: issued.record.name,
        created_at: issued.record.created_at,
    }))
}

pub async fn list_keys(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> Result<Json<ApiKeyListResponse>> {
    let keys = state.db.list_api_keys(user_id).await?;
    Ok(Json(ApiKeyListResponse { keys }))
}

pub async fn revoke_key(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    ValidJson(payload): ValidJson<RevokeKeyRequest>,
) -> Result<Json<RevokeKeyResponse>> {
    let key_id = require_uuid("key_id", payload.key_id.as_deref())?;
    api_key::revoke(&state.db, user_id, key_id).await?;
    Ok(Json(RevokeKeyResponse { success: true }))
}
