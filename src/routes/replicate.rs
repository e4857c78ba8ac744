use axum::{extract::State, Json};

use crate::auth::AnyUser;
use crate::error::Result;
use crate::replication::{self, ReplicationReport};
use crate::routes::backup::BackupIdRequest;
use crate::routes::validation::{require_uuid, ValidJson};
use crate::AppState;

/// Copy a completed backup to the caller's enabled targets
pub async fn replicate_backup(
    State(state): State<AppState>,
    AnyUser(user_id): AnyUser,
    ValidJson(payload): ValidJson<BackupIdRequest>,
) -> Result<Json<ReplicationReport>> {
    let backup_id = require_uuid("backupId", payload.backup_id.as_deref())?;
    let report = replication::replicate(&state, user_id, backup_id).await?;
    Ok(Json(report))
}
