//! Copy a completed backup to the user's third-party targets.
//!
//! The object is downloaded once and handed to each enabled target in turn.
//! Target failures are independent and never retried; the outcome of every
//! attempt lands in a single `replicate` audit row.

pub mod dropbox;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::constants::ERR_NO_REPLICATION_SETTINGS;
use crate::error::{AppError, Result};
use crate::lifecycle::load_owned;
use crate::models::{Backup, BackupLog, BackupStatus, LogAction, LogStatus, UserSettings};
use crate::AppState;

pub use dropbox::DropboxTarget;
pub use s3::S3Target;

/// A destination a backup archive can be copied to
#[async_trait]
pub trait ReplicationTarget: Send + Sync {
    /// Name reported in results (`s3`, `dropbox`)
    fn service(&self) -> &'static str;

    async fn upload(&self, backup: &Backup, data: Bytes) -> std::result::Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicationResult {
    pub service: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplicationReport {
    pub success: bool,
    pub message: String,
    pub results: Vec<ReplicationResult>,
}

impl ReplicationReport {
    pub fn successful(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}

/// Targets enabled and fully configured in `settings`, S3 first
pub fn targets_for(settings: &UserSettings, state: &AppState) -> Vec<Box<dyn ReplicationTarget>> {
    let mut targets: Vec<Box<dyn ReplicationTarget>> = Vec::new();

    if let Some(target) = S3Target::from_settings(settings) {
        targets.push(Box::new(target));
    }
    if let Some(target) =
        DropboxTarget::from_settings(settings, state.http.clone(), &state.config.dropbox_content_url)
    {
        targets.push(Box::new(target));
    }

    targets
}

/// Replicate one of the caller's backups to every configured target
pub async fn replicate(state: &AppState, user_id: Uuid, backup_id: Uuid) -> Result<ReplicationReport> {
    let backup = load_owned(&state.db, user_id, backup_id).await?;
    if backup.status != BackupStatus::Completed {
        return Err(AppError::validation("Only completed backups can be replicated"));
    }

    let Some(settings) = state.db.get_user_settings(backup.user_id).await? else {
        tracing::info!(%backup_id, "No user settings found, skipping replication");
        return Ok(ReplicationReport {
            success: true,
            message: ERR_NO_REPLICATION_SETTINGS.to_string(),
            results: Vec::new(),
        });
    };

    let targets = targets_for(&settings, state);
    run_replication(state, &backup, &targets).await
}

/// Download the archive once and push it to each target sequentially
pub async fn run_replication(
    state: &AppState,
    backup: &Backup,
    targets: &[Box<dyn ReplicationTarget>],
) -> Result<ReplicationReport> {
    tracing::info!(backup_id = %backup.id, targets = targets.len(), "Starting replication");

    let data = state.storage.download(&backup.storage_path).await?;

    let mut results = Vec::with_capacity(targets.len());
    for target in targets {
        let result = match target.upload(backup, data.clone()).await {
            Ok(()) => {
                tracing::info!(backup_id = %backup.id, service = target.service(), "Replication succeeded");
                ReplicationResult {
                    service: target.service().to_string(),
                    success: true,
                    error: None,
                }
            }
            Err(error) => {
                tracing::warn!(backup_id = %backup.id, service = target.service(), "Replication failed: {}", error);
                ReplicationResult {
                    service: target.service().to_string(),
                    success: false,
                    error: Some(error),
                }
            }
        };
        results.push(result);
    }

    let successful = results.iter().filter(|r| r.success).count();
    let message = format!("Replication completed: {}/{} successful", successful, results.len());
    let status = if successful > 0 {
        LogStatus::Success
    } else {
        LogStatus::Failed
    };

    state
        .db
        .insert_backup_log(
            &BackupLog::new(backup.user_id, LogAction::Replicate, status, message.clone())
                .for_backup(backup.id)
                .with_metadata(json!({ "results": results })),
        )
        .await?;

    tracing::info!(backup_id = %backup.id, "{}", message);
    Ok(ReplicationReport {
        success: true,
        message,
        results,
    })
}
