use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-user integration settings (replication targets and GitHub sync)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSettings {
    pub user_id: Uuid,
    pub s3_enabled: bool,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub dropbox_enabled: bool,
    pub dropbox_token: Option<String>,
    pub github_enabled: bool,
    pub github_token: Option<String>,
    pub github_repo: Option<String>,
    pub github_branch: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    pub fn empty(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            s3_enabled: false,
            s3_bucket: None,
            s3_region: None,
            s3_access_key: None,
            s3_secret_key: None,
            dropbox_enabled: false,
            dropbox_token: None,
            github_enabled: false,
            github_token: None,
            github_repo: None,
            github_branch: None,
            updated_at: now,
        }
    }

    /// S3 replication needs the switch plus bucket and both credentials
    pub fn s3_ready(&self) -> bool {
        self.s3_enabled
            && has_value(&self.s3_bucket)
            && has_value(&self.s3_access_key)
            && has_value(&self.s3_secret_key)
    }

    pub fn dropbox_ready(&self) -> bool {
        self.dropbox_enabled && has_value(&self.dropbox_token)
    }
}

fn has_value(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_need_credentials() {
        let mut settings = UserSettings::empty(Uuid::new_v4(), Utc::now());
        settings.s3_enabled = true;
        settings.s3_bucket = Some("bucket".to_string());
        assert!(!settings.s3_ready());

        settings.s3_access_key = Some("AKIA".to_string());
        settings.s3_secret_key = Some("secret".to_string());
        assert!(settings.s3_ready());

        settings.dropbox_enabled = true;
        settings.dropbox_token = Some("  ".to_string());
        assert!(!settings.dropbox_ready());
    }
}
