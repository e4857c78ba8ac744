pub mod memory;
pub mod pool;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    ApiKey, Backup, BackupLog, PlanUpdate, StatusUpdate, Subscription, UserSettings,
    WebhookConfig, WebhookLog,
};

pub use memory::MemoryStore;
pub use pool::connect_pool;
pub use postgres::PgStore;

/// Database handle type (Arc-wrapped for sharing across handlers)
pub type Db = Arc<dyn Store>;

/// Row access for every table the service touches
///
/// Each method is a single statement; nothing here spans a transaction.
#[async_trait]
pub trait Store: Send + Sync {
    /// Round trip to the store, used by the health endpoint
    async fn ping(&self) -> Result<()>;

    // Subscriptions, roles, profiles

    async fn get_subscription(&self, user_id: Uuid) -> Result<Option<Subscription>>;

    /// Insert or replace the subscription keyed by `user_id`
    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()>;

    /// Apply a plan change to the row holding this Stripe subscription id.
    /// Returns the number of rows touched.
    async fn update_subscription_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
        update: &PlanUpdate,
        now: DateTime<Utc>,
    ) -> Result<u64>;

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>>;

    async fn is_admin(&self, user_id: Uuid) -> Result<bool>;

    // Backups

    async fn insert_backup(&self, backup: &Backup) -> Result<()>;

    async fn get_backup(&self, id: Uuid) -> Result<Option<Backup>>;

    async fn count_active_backups(&self, user_id: Uuid) -> Result<i64>;

    async fn sum_active_backup_bytes(&self, user_id: Uuid) -> Result<i64>;

    /// Non-deleted backups, newest first
    async fn list_active_backups(&self, user_id: Uuid, limit: Option<i64>) -> Result<Vec<Backup>>;

    async fn update_backup_status(&self, id: Uuid, update: &StatusUpdate) -> Result<()>;

    // Audit trail

    async fn insert_backup_log(&self, log: &BackupLog) -> Result<()>;

    async fn list_backup_logs(&self, user_id: Uuid, limit: i64) -> Result<Vec<BackupLog>>;

    // API keys

    async fn insert_api_key(&self, key: &ApiKey) -> Result<()>;

    async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>>;

    async fn touch_api_key(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn list_api_keys(&self, user_id: Uuid) -> Result<Vec<ApiKey>>;

    /// Tombstone a key. Returns false when the caller owns no live key with this id.
    async fn revoke_api_key(&self, user_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    // Webhooks

    async fn insert_webhook(&self, webhook: &WebhookConfig) -> Result<()>;

    async fn get_webhook(&self, user_id: Uuid, id: Uuid) -> Result<Option<WebhookConfig>>;

    async fn list_webhooks(&self, user_id: Uuid) -> Result<Vec<WebhookConfig>>;

    async fn update_webhook(&self, webhook: &WebhookConfig) -> Result<()>;

    async fn delete_webhook(&self, user_id: Uuid, id: Uuid) -> Result<bool>;

    async fn insert_webhook_log(&self, log: &WebhookLog) -> Result<()>;

    /// Newest first
    async fn list_webhook_logs(&self, webhook_id: Uuid, limit: i64) -> Result<Vec<WebhookLog>>;

    // Integration settings

    async fn get_user_settings(&self, user_id: Uuid) -> Result<Option<UserSettings>>;

    async fn upsert_user_settings(&self, settings: &UserSettings) -> Result<()>;
}
