use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audited actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAction {
    UploadInit,
    UploadComplete,
    UploadFail,
    Delete,
    Download,
    Replicate,
    ApiKeyCreate,
    ApiKeyRevoke,
}

impl LogAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LogAction::UploadInit => "upload_init",
            LogAction::UploadComplete => "upload_complete",
            LogAction::UploadFail => "upload_fail",
            LogAction::Delete => "delete",
            LogAction::Download => "download",
            LogAction::Replicate => "replicate",
            LogAction::ApiKeyCreate => "api_key_create",
            LogAction::ApiKeyRevoke => "api_key_revoke",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStatus {
    Success,
    Failed,
}

impl LogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LogStatus::Success => "success",
            LogStatus::Failed => "failed",
        }
    }
}

/// Append-only audit row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BackupLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub backup_id: Option<Uuid>,
    pub action: String,
    pub status: String,
    pub message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl BackupLog {
    pub fn new(user_id: Uuid, action: LogAction, status: LogStatus, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            backup_id: None,
            action: action.as_str().to_string(),
            status: status.as_str().to_string(),
            message: Some(message.into()),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_backup(mut self, backup_id: Uuid) -> Self {
        self.backup_id = Some(backup_id);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
