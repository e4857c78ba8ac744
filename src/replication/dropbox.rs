use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde_json::json;

use super::ReplicationTarget;
use crate::constants::DROPBOX_REPLICATION_FOLDER;
use crate::models::{Backup, UserSettings};

/// Dropbox content API upload (`/2/files/upload`)
pub struct DropboxTarget {
    http: Client,
    content_url: String,
    token: String,
}

impl DropboxTarget {
    pub fn new(http: Client, content_url: &str, token: &str) -> Self {
        Self {
            http,
            content_url: content_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn from_settings(settings: &UserSettings, http: Client, content_url: &str) -> Option<Self> {
        if !settings.dropbox_ready() {
            return None;
        }
        let token = settings.dropbox_token.as_deref()?;
        Some(Self::new(http, content_url, token))
    }

    pub fn api_arg(backup: &Backup) -> String {
        json!({
            "path": format!("{}/{}", DROPBOX_REPLICATION_FOLDER, backup.filename),
            "mode": "add",
            "autorename": true,
            "mute": false,
        })
        .to_string()
    }
}

#[async_trait]
impl ReplicationTarget for DropboxTarget {
    fn service(&self) -> &'static str {
        "dropbox"
    }

    async fn upload(&self, backup: &Backup, data: Bytes) -> Result<(), String> {
        let response = self
            .http
            .post(format!("{}/2/files/upload", self.content_url))
            .bearer_auth(&self.token)
            .header("content-type", "application/octet-stream")
            .header("Dropbox-API-Arg", Self::api_arg(backup))
            .body(data)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("Dropbox API error: {text}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackupTrigger;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_api_arg_targets_homesafe_folder() {
        let backup = Backup::new_upload(Uuid::new_v4(), 10, None, BackupTrigger::Manual, Utc::now());
        let arg: serde_json::Value = serde_json::from_str(&DropboxTarget::api_arg(&backup)).unwrap();

        assert_eq!(arg["path"], format!("/HomeSafe-Backups/{}", backup.filename));
        assert_eq!(arg["mode"], "add");
        assert_eq!(arg["autorename"], true);
    }
}
