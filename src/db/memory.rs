use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::Result;
use crate::models::{
    ApiKey, Backup, BackupLog, PlanUpdate, StatusUpdate, Subscription, UserSettings,
    WebhookConfig, WebhookLog,
};

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, String>,
    admins: HashSet<Uuid>,
    subscriptions: HashMap<Uuid, Subscription>,
    backups: Vec<Backup>,
    backup_logs: Vec<BackupLog>,
    api_keys: Vec<ApiKey>,
    webhooks: Vec<WebhookConfig>,
    webhook_logs: Vec<WebhookLog>,
    settings: HashMap<Uuid, UserSettings>,
}

/// Process-local store used for development (`DATABASE_URL=memory`) and tests
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile so billing can resolve the user by email
    pub async fn add_profile(&self, user_id: Uuid, email: &str) {
        self.tables.write().await.profiles.insert(user_id, email.to_string());
    }

    pub async fn grant_admin(&self, user_id: Uuid) {
        self.tables.write().await.admins.insert(user_id);
    }
}

/// Newest first; ties keep the most recently inserted row first
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    out
}

fn take<T>(rows: Vec<T>, limit: Option<i64>) -> Vec<T> {
    match limit {
        Some(n) => rows.into_iter().take(n.max(0) as usize).collect(),
        None => rows,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get_subscription(&self, user_id: Uuid) -> Result<Option<Subscription>> {
        Ok(self.tables.read().await.subscriptions.get(&user_id).cloned())
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
        let mut tables = self.tables.write().await;
        let mut row = subscription.clone();
        if let Some(existing) = tables.subscriptions.get(&subscription.user_id) {
            row.id = existing.id;
            row.created_at = existing.created_at;
        }
        tables.subscriptions.insert(subscription.user_id, row);
        Ok(())
    }

    async fn update_subscription_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
        update: &PlanUpdate,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let mut touched = 0;
        for subscription in tables.subscriptions.values_mut() {
            if subscription.stripe_subscription_id.as_deref() == Some(stripe_subscription_id) {
                update.apply(subscription, now);
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .iter()
            .find(|(_, e)| e.eq_ignore_ascii_case(email))
            .map(|(id, _)| *id))
    }

    async fn is_admin(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.tables.read().await.admins.contains(&user_id))
    }

    async fn insert_backup(&self, backup: &Backup) -> Result<()> {
        self.tables.write().await.backups.push(backup.clone());
        Ok(())
    }

    async fn get_backup(&self, id: Uuid) -> Result<Option<Backup>> {
        let tables = self.tables.read().await;
        Ok(tables.backups.iter().find(|b| b.id == id).cloned())
    }

    async fn count_active_backups(&self, user_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .backups
            .iter()
            .filter(|b| b.user_id == user_id && b.status.is_active())
            .count();
        Ok(count as i64)
    }

    async fn sum_active_backup_bytes(&self, user_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .backups
            .iter()
            .filter(|b| b.user_id == user_id && b.status.is_active())
            .map(|b| b.size_bytes)
            .sum())
    }

    async fn list_active_backups(&self, user_id: Uuid, limit: Option<i64>) -> Result<Vec<Backup>> {
        let tables = self.tables.read().await;
        let mine: Vec<Backup> = tables
            .backups
            .iter()
            .filter(|b| b.user_id == user_id && b.status.is_active())
            .cloned()
            .collect();
        let sorted = newest_first(&mine, |b| b.created_at);
        Ok(take(sorted, limit))
    }

    async fn update_backup_status(&self, id: Uuid, update: &StatusUpdate) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(backup) = tables.backups.iter_mut().find(|b| b.id == id) {
            update.apply(backup);
        }
        Ok(())
    }

    async fn insert_backup_log(&self, log: &BackupLog) -> Result<()> {
        self.tables.write().await.backup_logs.push(log.clone());
        Ok(())
    }

    async fn list_backup_logs(&self, user_id: Uuid, limit: i64) -> Result<Vec<BackupLog>> {
        let tables = self.tables.read().await;
        let mine: Vec<BackupLog> = tables
            .backup_logs
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        Ok(take(newest_first(&mine, |l| l.created_at), Some(limit)))
    }

    async fn insert_api_key(&self, key: &ApiKey) -> Result<()> {
        self.tables.write().await.api_keys.push(key.clone());
        Ok(())
    }

    async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>> {
        let tables = self.tables.read().await;
        Ok(tables.api_keys.iter().find(|k| k.key_hash == key_hash).cloned())
    }

    async fn touch_api_key(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(key) = tables.api_keys.iter_mut().find(|k| k.id == id) {
            key.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn list_api_keys(&self, user_id: Uuid) -> Result<Vec<ApiKey>> {
        let tables = self.tables.read().await;
        let mine: Vec<ApiKey> = tables
            .api_keys
            .iter()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&mine, |k| k.created_at))
    }

    async fn revoke_api_key(&self, user_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .api_keys
            .iter_mut()
            .find(|k| k.id == id && k.user_id == user_id && !k.is_revoked())
        {
            Some(key) => {
                key.revoked_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_webhook(&self, webhook: &WebhookConfig) -> Result<()> {
        self.tables.write().await.webhooks.push(webhook.clone());
        Ok(())
    }

    async fn get_webhook(&self, user_id: Uuid, id: Uuid) -> Result<Option<WebhookConfig>> {
        let tables = self.tables.read().await;
        Ok(tables
            .webhooks
            .iter()
            .find(|w| w.id == id && w.user_id == user_id)
            .cloned())
    }

    async fn list_webhooks(&self, user_id: Uuid) -> Result<Vec<WebhookConfig>> {
        let tables = self.tables.read().await;
        let mine: Vec<WebhookConfig> = tables
            .webhooks
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&mine, |w| w.created_at))
    }

    async fn update_webhook(&self, webhook: &WebhookConfig) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(row) = tables
            .webhooks
            .iter_mut()
            .find(|w| w.id == webhook.id && w.user_id == webhook.user_id)
        {
            *row = webhook.clone();
        }
        Ok(())
    }

    async fn delete_webhook(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.webhooks.len();
        tables.webhooks.retain(|w| !(w.id == id && w.user_id == user_id));
        let removed = tables.webhooks.len() < before;
        if removed {
            tables.webhook_logs.retain(|l| l.webhook_id != id);
        }
        Ok(removed)
    }

    async fn insert_webhook_log(&self, log: &WebhookLog) -> Result<()> {
        self.tables.write().await.webhook_logs.push(log.clone());
        Ok(())
    }

    async fn list_webhook_logs(&self, webhook_id: Uuid, limit: i64) -> Result<Vec<WebhookLog>> {
        let tables = self.tables.read().await;
        let mine: Vec<WebhookLog> = tables
            .webhook_logs
            .iter()
            .filter(|l| l.webhook_id == webhook_id)
            .cloned()
            .collect();
        Ok(take(newest_first(&mine, |l| l.created_at), Some(limit)))
    }

    async fn get_user_settings(&self, user_id: Uuid) -> Result<Option<UserSettings>> {
        Ok(self.tables.read().await.settings.get(&user_id).cloned())
    }

    async fn upsert_user_settings(&self, settings: &UserSettings) -> Result<()> {
        self.tables
            .write()
            .await
            .settings
            .insert(settings.user_id, settings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackupTrigger, Plan};

    #[tokio::test]
    async fn test_deleted_backups_do_not_count() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();

        let kept = Backup::new_upload(user_id, 100, None, BackupTrigger::Manual, Utc::now());
        let gone = Backup::new_upload(user_id, 50, None, BackupTrigger::Manual, Utc::now());
        store.insert_backup(&kept).await.unwrap();
        store.insert_backup(&gone).await.unwrap();
        store
            .update_backup_status(gone.id, &StatusUpdate::deleted())
            .await
            .unwrap();

        assert_eq!(store.count_active_backups(user_id).await.unwrap(), 1);
        assert_eq!(store.sum_active_backup_bytes(user_id).await.unwrap(), 100);
        let listed = store.list_active_backups(user_id, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, kept.id);
    }

    #[tokio::test]
    async fn test_stripe_update_touches_matching_row_only() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut sub = Subscription::for_plan(Uuid::new_v4(), Plan::Pro, now);
        sub.stripe_subscription_id = Some("sub_1".to_string());
        store.upsert_subscription(&sub).await.unwrap();

        let missed = store
            .update_subscription_by_stripe_id("sub_2", &PlanUpdate::downgrade_to_free(), now)
            .await
            .unwrap();
        assert_eq!(missed, 0);

        let hit = store
            .update_subscription_by_stripe_id("sub_1", &PlanUpdate::downgrade_to_free(), now)
            .await
            .unwrap();
        assert_eq!(hit, 1);
        let stored = store.get_subscription(sub.user_id).await.unwrap().unwrap();
        assert_eq!(stored.plan, Plan::Free);
        assert!(stored.stripe_subscription_id.is_none());
    }

    #[tokio::test]
    async fn test_revoke_is_scoped_to_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let key = ApiKey::new(owner, "addon".to_string(), "h".repeat(64), Utc::now());
        store.insert_api_key(&key).await.unwrap();

        assert!(!store.revoke_api_key(Uuid::new_v4(), key.id, Utc::now()).await.unwrap());
        assert!(store.revoke_api_key(owner, key.id, Utc::now()).await.unwrap());
        assert!(!store.revoke_api_key(owner, key.id, Utc::now()).await.unwrap());
    }
}
