use async_trait::async_trait;
use bytes::Bytes;
use object_store::{
    aws::AmazonS3Builder, path::Path, Attribute, Attributes, ObjectStore, PutOptions, PutPayload,
};

use super::ReplicationTarget;
use crate::constants::{DEFAULT_S3_REGION, S3_REPLICATION_PREFIX};
use crate::models::{Backup, UserSettings};

const S3_CONTENT_TYPE: &str = "application/tar";

/// User-owned S3 bucket; the client is built per upload from stored credentials
pub struct S3Target {
    bucket: String,
    region: String,
    access_key: String,
    secret_key: String,
}

impl S3Target {
    pub fn from_settings(settings: &UserSettings) -> Option<Self> {
        if !settings.s3_ready() {
            return None;
        }
        Some(Self {
            bucket: settings.s3_bucket.clone()?,
            region: settings
                .s3_region
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            access_key: settings.s3_access_key.clone()?,
            secret_key: settings.s3_secret_key.clone()?,
        })
    }

    pub fn object_key(backup: &Backup) -> String {
        format!("{}/{}", S3_REPLICATION_PREFIX, backup.filename)
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl ReplicationTarget for S3Target {
    fn service(&self) -> &'static str {
        "s3"
    }

    async fn upload(&self, backup: &Backup, data: Bytes) -> Result<(), String> {
        let store = AmazonS3Builder::new()
            .with_bucket_name(&self.bucket)
            .with_region(&self.region)
            .with_access_key_id(&self.access_key)
            .with_secret_access_key(&self.secret_key)
            .build()
            .map_err(|e| e.to_string())?;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, S3_CONTENT_TYPE.into());
        let mut options = PutOptions::default();
        options.attributes = attributes;

        let key = Path::from(Self::object_key(backup));
        store
            .put_opts(&key, PutPayload::from(data), options)
            .await
            .map_err(|e| e.to_string())?;
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
    fn test_region_defaults_and_key_prefix() {
        let user_id = Uuid::new_v4();
        let mut settings = UserSettings::empty(user_id, Utc::now());
        settings.s3_enabled = true;
        settings.s3_bucket = Some("ha-archive".to_string());
        settings.s3_access_key = Some("AKIA".to_string());
        settings.s3_secret_key = Some("secret".to_string());

        let target = S3Target::from_settings(&settings).unwrap();
        assert_eq!(target.region(), "us-east-1");

        let backup = Backup::new_upload(user_id, 10, None, BackupTrigger::Manual, Utc::now());
        assert_eq!(
            S3Target::object_key(&backup),
            format!("homesafe-backups/{}", backup.filename)
        );
    }

    #[test]
    fn test_disabled_s3_yields_no_target() {
        let mut settings = UserSettings::empty(Uuid::new_v4(), Utc::now());
        settings.s3_bucket = Some("ha-archive".to_string());
        settings.s3_access_key = Some("AKIA".to_string());
        settings.s3_secret_key = Some("secret".to_string());

        assert!(S3Target::from_settings(&settings).is_none());
    }
}
