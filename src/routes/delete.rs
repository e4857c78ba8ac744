use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::auth::SessionUser;
use crate::error::Result;
use crate::lifecycle;
use crate::routes::backup::BackupIdRequest;
use crate::routes::validation::{require_uuid, ValidJson};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DeleteBackupResponse {
    pub success: bool,
}

/// Soft-delete a backup named in the body (`{"backupId": ...}`)
pub async fn delete_backup(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    ValidJson(payload): ValidJson<BackupIdRequest>,
) -> Result<Json<DeleteBackupResponse>> {
    let backup_id = require_uuid("backupId", payload.backup_id.as_deref())?;
    lifecycle::delete_backup(&state, user_id, backup_id).await?;
    Ok(Json(DeleteBackupResponse { success: true }))
}

/// Path form: `/backup-delete/:id`
pub async fn delete_backup_by_path(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteBackupResponse>> {
    let backup_id = require_uuid("backup ID", Some(&id))?;
    lifecycle::delete_backup(&state, user_id, backup_id).await?;
    Ok(Json(DeleteBackupResponse { success: true }))
}
