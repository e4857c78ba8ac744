use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::Store;
use crate::error::Result;
use crate::models::{
    ApiKey, Backup, BackupLog, BackupStatus, PlanUpdate, StatusUpdate, Subscription,
    UserSettings, WebhookConfig, WebhookLog,
};

const BACKUP_COLUMNS: &str = "id, user_id, filename, storage_path, size_bytes, status, \
     backup_trigger, ha_version, created_at, completed_at, error_message";

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan, max_backups, max_storage_gb, \
     max_backup_size_gb, retention_days, stripe_customer_id, stripe_subscription_id, \
     current_period_end, created_at, updated_at";

const WEBHOOK_COLUMNS: &str =
    "id, user_id, name, webhook_url, events, enabled, created_at, updated_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_subscription(&self, user_id: Uuid) -> Result<Option<Subscription>> {
        let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1");
        let row = sqlx::query_as::<_, Subscription>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn upsert_subscription(&self, s: &Subscription) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, user_id, plan, max_backups, max_storage_gb,
                max_backup_size_gb, retention_days, stripe_customer_id, stripe_subscription_id,
                current_period_end, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (user_id) DO UPDATE SET
                plan = EXCLUDED.plan,
                max_backups = EXCLUDED.max_backups,
                max_storage_gb = EXCLUDED.max_storage_gb,
                max_backup_size_gb = EXCLUDED.max_backup_size_gb,
                retention_days = EXCLUDED.retention_days,
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                current_period_end = EXCLUDED.current_period_end,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(s.id)
        .bind(s.user_id)
        .bind(s.plan)
        .bind(s.max_backups)
        .bind(s.max_storage_gb)
        .bind(s.max_backup_size_gb)
        .bind(s.retention_days)
        .bind(&s.stripe_customer_id)
        .bind(&s.stripe_subscription_id)
        .bind(s.current_period_end)
        .bind(s.created_at)
        .bind(s.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_subscription_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
        update: &PlanUpdate,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let limits = update.plan.limits();
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                plan = $2,
                max_backups = $3,
                max_storage_gb = $4,
                max_backup_size_gb = $5,
                retention_days = $6,
                current_period_end = $7,
                stripe_subscription_id = CASE WHEN $8 THEN NULL ELSE stripe_subscription_id END,
                updated_at = $9
            WHERE stripe_subscription_id = $1
            "#,
        )
        .bind(stripe_subscription_id)
        .bind(update.plan)
        .bind(limits.max_backups)
        .bind(limits.max_storage_gb)
        .bind(limits.max_backup_size_gb)
        .bind(limits.retention_days)
        .bind(update.current_period_end)
        .bind(update.detach_stripe_subscription)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM profiles WHERE lower(email) = lower($1) LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn is_admin(&self, user_id: Uuid) -> Result<bool> {
        let admin = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = $1 AND role = 'admin')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn insert_backup(&self, b: &Backup) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO backups (id, user_id, filename, storage_path, size_bytes, status,
                backup_trigger, ha_version, created_at, completed_at, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(b.id)
        .bind(b.user_id)
        .bind(&b.filename)
        .bind(&b.storage_path)
        .bind(b.size_bytes)
        .bind(b.status)
        .bind(&b.backup_trigger)
        .bind(&b.ha_version)
        .bind(b.created_at)
        .bind(b.completed_at)
        .bind(&b.error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_backup(&self, id: Uuid) -> Result<Option<Backup>> {
        let sql = format!("SELECT {BACKUP_COLUMNS} FROM backups WHERE id = $1");
        let row = sqlx::query_as::<_, Backup>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn count_active_backups(&self, user_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM backups WHERE user_id = $1 AND status <> $2",
        )
        .bind(user_id)
        .bind(BackupStatus::Deleted)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn sum_active_backup_bytes(&self, user_id: Uuid) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(size_bytes), 0)::BIGINT FROM backups \
             WHERE user_id = $1 AND status <> $2",
        )
        .bind(user_id)
        .bind(BackupStatus::Deleted)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn list_active_backups(&self, user_id: Uuid, limit: Option<i64>) -> Result<Vec<Backup>> {
        // LIMIT NULL is LIMIT ALL in Postgres
        let sql = format!(
            "SELECT {BACKUP_COLUMNS} FROM backups WHERE user_id = $1 AND status <> $2 \
             ORDER BY created_at DESC LIMIT $3"
        );
        let rows = sqlx::query_as::<_, Backup>(&sql)
            .bind(user_id)
            .bind(BackupStatus::Deleted)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_backup_status(&self, id: Uuid, update: &StatusUpdate) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE backups SET
                status = $2,
                completed_at = COALESCE($3, completed_at),
                error_message = COALESCE($4, error_message)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.status)
        .bind(update.completed_at)
        .bind(&update.error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_backup_log(&self, log: &BackupLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO backup_logs (id, user_id, backup_id, action, status, message, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(log.id)
        .bind(log.user_id)
        .bind(log.backup_id)
        .bind(&log.action)
        .bind(&log.status)
        .bind(&log.message)
        .bind(&log.metadata)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_backup_logs(&self, user_id: Uuid, limit: i64) -> Result<Vec<BackupLog>> {
        let rows = sqlx::query_as::<_, BackupLog>(
            r#"
            SELECT id, user_id, backup_id, action, status, message, metadata, created_at
            FROM backup_logs WHERE user_id = $1
            ORDER BY created_at DESC LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_api_key(&self, key: &ApiKey) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (id, user_id, name, key_hash, created_at, last_used_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(key.id)
        .bind(key.user_id)
        .bind(&key.name)
        .bind(&key.key_hash)
        .bind(key.created_at)
        .bind(key.last_used_at)
        .bind(key.revoked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>> {
        let row = sqlx::query_as::<_, ApiKey>(
            "SELECT id, user_id, name, key_hash, created_at, last_used_at, revoked_at \
             FROM api_keys WHERE key_hash = $1",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn touch_api_key(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_api_keys(&self, user_id: Uuid) -> Result<Vec<ApiKey>> {
        let rows = sqlx::query_as::<_, ApiKey>(
            "SELECT id, user_id, name, key_hash, created_at, last_used_at, revoked_at \
             FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn revoke_api_key(&self, user_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE api_keys SET revoked_at = $3 \
             WHERE id = $1 AND user_id = $2 AND revoked_at IS NULL",
        )
        .bind(id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_webhook(&self, w: &WebhookConfig) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO webhook_configs (id, user_id, name, webhook_url, events, enabled, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(w.id)
        .bind(w.user_id)
        .bind(&w.name)
        .bind(&w.webhook_url)
        .bind(&w.events)
        .bind(w.enabled)
        .bind(w.created_at)
        .bind(w.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_webhook(&self, user_id: Uuid, id: Uuid) -> Result<Option<WebhookConfig>> {
        let sql = format!("SELECT {WEBHOOK_COLUMNS} FROM webhook_configs WHERE id = $1 AND user_id = $2");
        let row = sqlx::query_as::<_, WebhookConfig>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_webhooks(&self, user_id: Uuid) -> Result<Vec<WebhookConfig>> {
        let sql = format!(
            "SELECT {WEBHOOK_COLUMNS} FROM webhook_configs WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, WebhookConfig>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_webhook(&self, w: &WebhookConfig) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE webhook_configs SET name = $3, webhook_url = $4, events = $5, enabled = $6, updated_at = $7
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(w.id)
        .bind(w.user_id)
        .bind(&w.name)
        .bind(&w.webhook_url)
        .bind(&w.events)
        .bind(w.enabled)
        .bind(w.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_webhook(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM webhook_configs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_webhook_log(&self, log: &WebhookLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO webhook_logs (id, webhook_id, event_type, status, response_code, error_message, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(log.id)
        .bind(log.webhook_id)
        .bind(&log.event_type)
        .bind(&log.status)
        .bind(log.response_code)
        .bind(&log.error_message)
        .bind(&log.payload)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_webhook_logs(&self, webhook_id: Uuid, limit: i64) -> Result<Vec<WebhookLog>> {
        let rows = sqlx::query_as::<_, WebhookLog>(
            r#"
            SELECT id, webhook_id, event_type, status, response_code, error_message, payload, created_at
            FROM webhook_logs WHERE webhook_id = $1
            ORDER BY created_at DESC LIMIT $2
            "#,
        )
        .bind(webhook_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_user_settings(&self, user_id: Uuid) -> Result<Option<UserSettings>> {
        let row = sqlx::query_as::<_, UserSettings>(
            r#"
            SELECT user_id, s3_enabled, s3_bucket, s3_region, s3_access_key, s3_secret_key,
                dropbox_enabled, dropbox_token, github_enabled, github_token, github_repo,
                github_branch, updated_at
            FROM user_settings WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_user_settings(&self, s: &UserSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_settings (user_id, s3_enabled, s3_bucket, s3_region, s3_access_key,
                s3_secret_key, dropbox_enabled, dropbox_token, github_enabled, github_token,
                github_repo, github_branch, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (user_id) DO UPDATE SET
                s3_enabled = EXCLUDED.s3_enabled,
                s3_bucket = EXCLUDED.s3_bucket,
                s3_region = EXCLUDED.s3_region,
                s3_access_key = EXCLUDED.s3_access_key,
                s3_secret_key = EXCLUDED.s3_secret_key,
                dropbox_enabled = EXCLUDED.dropbox_enabled,
                dropbox_token = EXCLUDED.dropbox_token,
                github_enabled = EXCLUDED.github_enabled,
                github_token = EXCLUDED.github_token,
                github_repo = EXCLUDED.github_repo,
                github_branch = EXCLUDED.github_branch,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(s.user_id)
        .bind(s.s3_enabled)
        .bind(&s.s3_bucket)
        .bind(&s.s3_region)
        .bind(&s.s3_access_key)
        .bind(&s.s3_secret_key)
        .bind(s.dropbox_enabled)
        .bind(&s.dropbox_token)
        .bind(s.github_enabled)
        .bind(&s.github_token)
        .bind(&s.github_repo)
        .bind(&s.github_branch)
        .bind(s.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
