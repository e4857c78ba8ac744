use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{ApiKeyUser, SessionUser};
use crate::constants::{BACKUP_LOG_LIMIT, DEFAULT_BACKUP_LIST_LIMIT, ERR_BACKUP_NOT_FOUND};
use crate::error::{AppError, Result};
use crate::lifecycle::load_owned;
use crate::models::{Backup, BackupLog, BackupStatus, LogAction, LogStatus};
use crate::routes::validation::{require_uuid, ValidJson};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct BackupListResponse {
    pub backups: Vec<Backup>,
}

#[derive(Debug, Deserialize)]
pub struct BackupIdRequest {
    #[serde(rename = "backupId")]
    pub backup_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub download_url: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct BackupLogsResponse {
    pub logs: Vec<BackupLog>,
}

/// List the caller's backups, newest first
///
/// Admins see every non-deleted backup; everyone else the latest 10.
pub async fn list_backups(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> Result<Json<BackupListResponse>> {
    let limit = if state.db.is_admin(user_id).await? {
        None
    } else {
        Some(DEFAULT_BACKUP_LIST_LIMIT)
    };

    let backups = state.db.list_active_backups(user_id, limit).await?;
    tracing::debug!(%user_id, count = backups.len(), "Listed backups");

    Ok(Json(BackupListResponse { backups }))
}

/// Same listing for the add-on, authenticated by API key
pub async fn list_backups_api_key(
    State(state): State<AppState>,
    ApiKeyUser(user_id): ApiKeyUser,
) -> Result<Json<BackupListResponse>> {
    let backups = state
        .db
        .list_active_backups(user_id, Some(DEFAULT_BACKUP_LIST_LIMIT))
        .await?;

    Ok(Json(BackupListResponse { backups }))
}

/// Issue a time-limited download URL for a completed backup
pub async fn download_backup(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    ValidJson(payload): ValidJson<BackupIdRequest>,
) -> Result<Json<DownloadResponse>> {
    let backup_id = require_uuid("backupId", payload.backup_id.as_deref())?;

    let backup = load_owned(&state.db, user_id, backup_id).await?;
    if backup.status != BackupStatus::Completed {
        return Err(AppError::not_found(ERR_BACKUP_NOT_FOUND));
    }

    let download_url = state
        .storage
        .create_signed_url(&backup.storage_path, state.config.signed_url_expiry())
        .await?;

    state
        .db
        .insert_backup_log(
            &BackupLog::new(
                user_id,
                LogAction::Download,
                LogStatus::Success,
                format!("Backup download initiated: {}", backup.filename),
            )
            .for_backup(backup.id),
        )
        .await?;

    tracing::info!(%user_id, %backup_id, "Download URL issued");
    Ok(Json(DownloadResponse {
        success: true,
        download_url,
        filename: backup.filename,
    }))
}

/// The caller's most recent audit rows
pub async fn list_backup_logs(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> Result<Json<BackupLogsResponse>> {
    let logs = state.db.list_backup_logs(user_id, BACKUP_LOG_LIMIT).await?;
    Ok(Json(BackupLogsResponse { logs }))
}
