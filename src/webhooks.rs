//! Outbound webhook delivery.
//!
//! Every dispatch is a single POST and produces exactly one [`WebhookLog`]
//! row, whatever the outcome. There is no retry.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::constants::WEBHOOK_USER_AGENT;
use crate::db::Db;
use crate::error::Result;
use crate::models::{Backup, DeliveryStatus, WebhookConfig, WebhookEvent, WebhookLog};

pub const TEST_PING_MESSAGE: &str = "This is a test webhook from HomeSafe";

/// Result of one delivery, as reported back to the caller of a test dispatch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub status: DeliveryStatus,
    pub response_code: Option<i32>,
    pub error_message: Option<String>,
}

#[derive(Clone)]
pub struct Notifier {
    db: Db,
    http: Client,
    timeout: Duration,
}

impl Notifier {
    pub fn new(db: Db, http: Client, timeout: Duration) -> Self {
        Self { db, http, timeout }
    }

    /// POST `payload` to the webhook and record the attempt
    pub async fn deliver(
        &self,
        webhook: &WebhookConfig,
        event: WebhookEvent,
        payload: Value,
    ) -> Result<DeliveryOutcome> {
        tracing::info!(webhook_id = %webhook.id, %event, "Sending webhook");

        let outcome = match self
            .http
            .post(&webhook.webhook_url)
            .header(reqwest::header::USER_AGENT, WEBHOOK_USER_AGENT)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                let code = Some(i32::from(status.as_u16()));
                if status.is_success() {
                    DeliveryOutcome {
                        success: true,
                        status: DeliveryStatus::Success,
                        response_code: code,
                        error_message: None,
                    }
                } else {
                    DeliveryOutcome {
                        success: false,
                        status: DeliveryStatus::Failed,
                        response_code: code,
                        error_message: Some(format!(
                            "HTTP {}: {}",
                            status.as_u16(),
                            status.canonical_reason().unwrap_or_default()
                        )),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(webhook_id = %webhook.id, "Webhook delivery error: {}", e);
                DeliveryOutcome {
                    success: false,
                    status: DeliveryStatus::Failed,
                    response_code: None,
                    error_message: Some(e.to_string()),
                }
            }
        };

        let log = WebhookLog {
            id: Uuid::new_v4(),
            webhook_id: webhook.id,
            event_type: event.as_str().to_string(),
            status: outcome.status.as_str().to_string(),
            response_code: outcome.response_code,
            error_message: outcome.error_message.clone(),
            payload,
            created_at: Utc::now(),
        };
        self.db.insert_webhook_log(&log).await?;

        tracing::info!(
            webhook_id = %webhook.id,
            status = outcome.status.as_str(),
            code = ?outcome.response_code,
            "Webhook delivered"
        );
        Ok(outcome)
    }

    pub async fn send_test(&self, webhook: &WebhookConfig) -> Result<DeliveryOutcome> {
        let payload = test_payload(webhook, Utc::now());
        self.deliver(webhook, WebhookEvent::TestPing, payload).await
    }

    /// Deliver a lifecycle event to every enabled webhook of the owner subscribed to it.
    /// Returns the number of deliveries attempted.
    pub async fn notify_backup_event(&self, backup: &Backup, event: WebhookEvent) -> Result<usize> {
        let webhooks = self.db.list_webhooks(backup.user_id).await?;
        let payload = backup_payload(event, backup, Utc::now());

        let mut sent = 0;
        for webhook in webhooks.iter().filter(|w| w.subscribes_to(event)) {
            if let Err(e) = self.deliver(webhook, event, payload.clone()).await {
                tracing::error!(webhook_id = %webhook.id, "Failed to record webhook delivery: {}", e);
            }
            sent += 1;
        }
        Ok(sent)
    }

    /// Fire-and-forget variant used by lifecycle handlers
    pub fn spawn_backup_event(&self, backup: Backup, event: WebhookEvent) {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify_backup_event(&backup, event).await {
                tracing::warn!(backup_id = %backup.id, %event, "Webhook notification failed: {}", e);
            }
        });
    }
}

pub fn test_payload(webhook: &WebhookConfig, now: DateTime<Utc>) -> Value {
    json!({
        "event": WebhookEvent::TestPing.as_str(),
        "timestamp": now.to_rfc3339(),
        "message": TEST_PING_MESSAGE,
        "webhook_name": webhook.name,
    })
}

pub fn backup_payload(event: WebhookEvent, backup: &Backup, now: DateTime<Utc>) -> Value {
    json!({
        "event": event.as_str(),
        "timestamp": now.to_rfc3339(),
        "backup": {
            "id": backup.id,
            "filename": backup.filename,
            "size_bytes": backup.size_bytes,
            "status": backup.status,
            "ha_version": backup.ha_version,
            "error_message": backup.error_message,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackupTrigger;

    #[test]
    fn test_backup_payload_shape() {
        let now = Utc::now();
        let backup = Backup::new_upload(Uuid::new_v4(), 1024, Some("2024.1".into()), BackupTrigger::Api, now);

        let payload = backup_payload(WebhookEvent::BackupCompleted, &backup, now);

        assert_eq!(payload["event"], "backup.completed");
        assert_eq!(payload["backup"]["size_bytes"], 1024);
        assert_eq!(payload["backup"]["status"], "uploading");
        assert_eq!(payload["backup"]["ha_version"], "2024.1");
    }
}
