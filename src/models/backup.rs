use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Upload lifecycle state of a backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "backup_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Uploading,
    Completed,
    Failed,
    Deleted,
}

impl BackupStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BackupStatus::Uploading => "uploading",
            BackupStatus::Completed => "completed",
            BackupStatus::Failed => "failed",
            BackupStatus::Deleted => "deleted",
        }
    }

    /// Whether the backup still counts against quota
    pub fn is_active(self) -> bool {
        self != BackupStatus::Deleted
    }

    /// Allowed moves: uploading -> completed | failed, and any live state -> deleted.
    /// Nothing leaves `deleted` and nothing returns to `uploading`.
    pub fn can_transition_to(self, next: BackupStatus) -> bool {
        matches!(
            (self, next),
            (BackupStatus::Uploading, BackupStatus::Completed)
                | (BackupStatus::Uploading, BackupStatus::Failed)
                | (BackupStatus::Uploading, BackupStatus::Deleted)
                | (BackupStatus::Completed, BackupStatus::Deleted)
                | (BackupStatus::Failed, BackupStatus::Deleted)
        )
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What started a backup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupTrigger {
    #[default]
    Manual,
    Scheduled,
    PreUpdate,
    Api,
}

impl BackupTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            BackupTrigger::Manual => "manual",
            BackupTrigger::Scheduled => "scheduled",
            BackupTrigger::PreUpdate => "pre_update",
            BackupTrigger::Api => "api",
        }
    }
}

/// One archived Home Assistant snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Backup {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    /// Object path inside the backups bucket: `<user_id>/<millis>-<filename>`
    pub storage_path: String,
    pub size_bytes: i64,
    pub status: BackupStatus,
    pub backup_trigger: Option<String>,
    pub ha_version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Backup {
    /// Build a fresh row in `uploading` state with a generated filename and path
    pub fn new_upload(
        user_id: Uuid,
        size_bytes: i64,
        ha_version: Option<String>,
        trigger: BackupTrigger,
        now: DateTime<Utc>,
    ) -> Self {
        let millis = now.timestamp_millis();
        let filename = format!("backup-{millis}.tar");
        let storage_path = format!("{user_id}/{millis}-{filename}");

        Self {
            id: Uuid::new_v4(),
            user_id,
            filename,
            storage_path,
            size_bytes,
            status: BackupStatus::Uploading,
            backup_trigger: Some(trigger.as_str().to_string()),
            ha_version: Some(ha_version.unwrap_or_else(|| "unknown".to_string())),
            created_at: now,
            completed_at: None,
            error_message: None,
        }
    }
}

/// Column changes applied together with a status transition
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: BackupStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl StatusUpdate {
    pub fn completed(at: DateTime<Utc>) -> Self {
        Self {
            status: BackupStatus::Completed,
            completed_at: Some(at),
            error_message: None,
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            status: BackupStatus::Failed,
            completed_at: None,
            error_message: Some(message),
        }
    }

    pub fn deleted() -> Self {
        Self {
            status: BackupStatus::Deleted,
            completed_at: None,
            error_message: None,
        }
    }

    /// Apply to an in-memory row, keeping columns the update leaves alone
    pub fn apply(&self, backup: &mut Backup) {
        backup.status = self.status;
        if self.completed_at.is_some() {
            backup.completed_at = self.completed_at;
        }
        if self.error_message.is_some() {
            backup.error_message = self.error_message.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use BackupStatus::*;

        assert!(Uploading.can_transition_to(Completed));
        assert!(Uploading.can_transition_to(Failed));
        assert!(Completed.can_transition_to(Deleted));
        assert!(Failed.can_transition_to(Deleted));

        // No resurrection and no return to uploading
        assert!(!Deleted.can_transition_to(Completed));
        assert!(!Deleted.can_transition_to(Uploading));
        assert!(!Deleted.can_transition_to(Deleted));
        assert!(!Completed.can_transition_to(Uploading));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Failed));
    }

    #[test]
    fn test_new_upload_paths() {
        let user_id = Uuid::new_v4();
        let now = DateTime::from_timestamp_millis(1_733_788_800_123).unwrap();
        let backup = Backup::new_upload(user_id, 42, None, BackupTrigger::Api, now);

        assert_eq!(backup.filename, "backup-1733788800123.tar");
        assert_eq!(
            backup.storage_path,
            format!("{user_id}/1733788800123-backup-1733788800123.tar")
        );
        assert_eq!(backup.status, BackupStatus::Uploading);
        assert_eq!(backup.ha_version.as_deref(), Some("unknown"));
        assert_eq!(backup.backup_trigger.as_deref(), Some("api"));
    }

    #[test]
    fn test_trigger_serde() {
        let trigger: BackupTrigger = serde_json::from_str("\"pre_update\"").unwrap();
        assert_eq!(trigger, BackupTrigger::PreUpdate);
        assert!(serde_json::from_str::<BackupTrigger>("\"nightly\"").is_err());
    }
}
