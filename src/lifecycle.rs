//! Backup lifecycle: quota-gated init, chunk writes, completion, failure and
//! deletion.
//!
//! Every status change goes through [`transition`], which enforces the
//! `uploading -> completed | failed -> deleted` machine. Each operation then
//! appends its audit row and hands the event to the webhook notifier,
//! detached from the request.

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::constants::{ERR_BACKUP_NOT_FOUND, ERR_SUBSCRIPTION_NOT_FOUND};
use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{
    Backup, BackupLog, BackupStatus, BackupTrigger, LogAction, LogStatus, StatusUpdate,
    WebhookEvent,
};
use crate::quota;
use crate::AppState;

pub const DEFAULT_FAILURE_MESSAGE: &str = "Upload failed";

/// Body of `action=init`
#[derive(Debug, Clone, Deserialize)]
pub struct InitUpload {
    pub file_size: Option<i64>,
    pub ha_version: Option<String>,
    #[serde(default)]
    pub backup_trigger: BackupTrigger,
}

/// Load a backup the caller owns. Foreign and missing rows are both `NotFound`.
pub async fn load_owned(db: &Db, user_id: Uuid, backup_id: Uuid) -> Result<Backup> {
    match db.get_backup(backup_id).await? {
        Some(backup) if backup.user_id == user_id => Ok(backup),
        _ => Err(AppError::not_found(ERR_BACKUP_NOT_FOUND)),
    }
}

/// Apply a status change if the machine allows it
pub async fn transition(db: &Db, backup: &Backup, update: StatusUpdate) -> Result<Backup> {
    if !backup.status.can_transition_to(update.status) {
        return Err(AppError::InvalidTransition {
            from: backup.status,
            to: update.status,
        });
    }

    db.update_backup_status(backup.id, &update).await?;

    let mut updated = backup.clone();
    update.apply(&mut updated);
    tracing::debug!(backup_id = %backup.id, from = %backup.status, to = %updated.status, "Backup transitioned");
    Ok(updated)
}

/// Validate plan limits and create the `uploading` row
///
/// Order: subscription, count, single size, total storage. Nothing is
/// written when a check fails.
pub async fn init_upload(state: &AppState, user_id: Uuid, request: InitUpload) -> Result<Backup> {
    let size_bytes = match request.file_size {
        Some(size) if size > 0 => size,
        _ => return Err(AppError::validation("file_size must be a positive integer")),
    };

    let subscription = state
        .db
        .get_subscription(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(ERR_SUBSCRIPTION_NOT_FOUND))?;

    let active_count = state.db.count_active_backups(user_id).await?;
    quota::check_backup_count(&subscription, active_count)?;
    quota::check_backup_size(&subscription, size_bytes)?;

    let used_bytes = state.db.sum_active_backup_bytes(user_id).await?;
    quota::check_total_storage(&subscription, used_bytes, size_bytes)?;

    let backup = Backup::new_upload(
        user_id,
        size_bytes,
        request.ha_version.filter(|v| !v.trim().is_empty()),
        request.backup_trigger,
        Utc::now(),
    );
    state.db.insert_backup(&backup).await?;

    state
        .db
        .insert_backup_log(
            &BackupLog::new(
                user_id,
                LogAction::UploadInit,
                LogStatus::Success,
                format!("Upload started: {}", backup.filename),
            )
            .for_backup(backup.id)
            .with_metadata(json!({
                "size_bytes": backup.size_bytes,
                "ha_version": backup.ha_version,
                "backup_trigger": backup.backup_trigger,
            })),
        )
        .await?;

    tracing::info!(%user_id, backup_id = %backup.id, size_bytes, "Upload initialized");
    Ok(backup)
}

/// Store one chunk. Offset 0 starts the object; later offsets must equal the
/// bytes already stored and are appended. The object may never grow past the
/// size declared at init. Returns the stored size.
pub async fn write_chunk(
    state: &AppState,
    user_id: Uuid,
    backup_id: Uuid,
    chunk_number: u32,
    offset: u64,
    data: Bytes,
) -> Result<u64> {
    let backup = load_owned(&state.db, user_id, backup_id).await?;
    if backup.status != BackupStatus::Uploading {
        return Err(AppError::InvalidTransition {
            from: backup.status,
            to: BackupStatus::Uploading,
        });
    }
    quota::check_chunk_within_declared(backup.size_bytes, offset, data.len())?;

    let object = if offset == 0 {
        data
    } else {
        let existing = state.storage.download(&backup.storage_path).await?;
        if existing.len() as u64 != offset {
            return Err(AppError::validation(format!(
                "Chunk offset {} does not match stored size {}",
                offset,
                existing.len()
            )));
        }
        let mut joined = BytesMut::with_capacity(existing.len() + data.len());
        joined.extend_from_slice(&existing);
        joined.extend_from_slice(&data);
        joined.freeze()
    };

    let stored = object.len() as u64;
    state
        .storage
        .upload(&backup.storage_path, object, true)
        .await?;

    tracing::info!(%backup_id, chunk_number, offset, stored, "Chunk stored");
    Ok(stored)
}

pub async fn complete_upload(state: &AppState, user_id: Uuid, backup_id: Uuid) -> Result<Backup> {
    let backup = load_owned(&state.db, user_id, backup_id).await?;
    let completed = transition(&state.db, &backup, StatusUpdate::completed(Utc::now())).await?;

    state
        .db
        .insert_backup_log(
            &BackupLog::new(
                user_id,
                LogAction::UploadComplete,
                LogStatus::Success,
                format!("Backup uploaded successfully: {}", completed.filename),
            )
            .for_backup(backup_id)
            .with_metadata(json!({
                "size_bytes": completed.size_bytes,
                "ha_version": completed.ha_version,
            })),
        )
        .await?;

    state
        .notifier()
        .spawn_backup_event(completed.clone(), WebhookEvent::BackupCompleted);

    tracing::info!(%user_id, %backup_id, "Upload completed");
    Ok(completed)
}

pub async fn fail_upload(
    state: &AppState,
    user_id: Uuid,
    backup_id: Uuid,
    error_message: Option<String>,
) -> Result<Backup> {
    let message = error_message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());

    let backup = load_owned(&state.db, user_id, backup_id).await?;
    let failed = transition(&state.db, &backup, StatusUpdate::failed(message.clone())).await?;

    state
        .db
        .insert_backup_log(
            &BackupLog::new(user_id, LogAction::UploadFail, LogStatus::Failed, message)
                .for_backup(backup_id),
        )
        .await?;

    state
        .notifier()
        .spawn_backup_event(failed.clone(), WebhookEvent::BackupFailed);

    tracing::warn!(%user_id, %backup_id, "Upload marked as failed");
    Ok(failed)
}

/// Soft-delete a backup, removing its object first when it was completed
///
/// A storage removal failure is logged and does not block the status change.
/// An already deleted backup is `NotFound`.
pub async fn delete_backup(state: &AppState, user_id: Uuid, backup_id: Uuid) -> Result<Backup> {
    let backup = load_owned(&state.db, user_id, backup_id).await?;
    if backup.status == BackupStatus::Deleted {
        return Err(AppError::not_found(ERR_BACKUP_NOT_FOUND));
    }

    if backup.status == BackupStatus::Completed {
        tracing::info!(%backup_id, path = %backup.storage_path, "Removing backup object");
        if let Err(e) = state
            .storage
            .remove(std::slice::from_ref(&backup.storage_path))
            .await
        {
            tracing::warn!(%backup_id, "Failed to remove backup object, marking deleted anyway: {}", e);
        }
    } else {
        tracing::info!(%backup_id, status = %backup.status, "Skipping object removal for incomplete backup");
    }

    let deleted = transition(&state.db, &backup, StatusUpdate::deleted()).await?;

    state
        .db
        .insert_backup_log(
            &BackupLog::new(
                user_id,
                LogAction::Delete,
                LogStatus::Success,
                format!("Backup deleted: {}", deleted.filename),
            )
            .for_backup(backup_id),
        )
        .await?;

    state
        .notifier()
        .spawn_backup_event(deleted.clone(), WebhookEvent::BackupDeleted);

    Ok(deleted)
}

/// Init, write and complete in one request (add-on streaming upload)
///
/// A storage failure marks the backup failed before the error is returned.
pub async fn upload_whole(
    state: &AppState,
    user_id: Uuid,
    data: Bytes,
    ha_version: Option<String>,
) -> Result<Backup> {
    let backup = init_upload(
        state,
        user_id,
        InitUpload {
            file_size: Some(data.len() as i64),
            ha_version,
            backup_trigger: BackupTrigger::Api,
        },
    )
    .await?;

    if let Err(e) = state.storage.upload(&backup.storage_path, data, true).await {
        tracing::error!(backup_id = %backup.id, "Streaming upload failed: {}", e);
        fail_upload(
            state,
            user_id,
            backup.id,
            Some(format!("Storage upload failed: {e}")),
        )
        .await?;
        return Err(e.into());
    }

    complete_upload(state, user_id, backup.id).await
}
