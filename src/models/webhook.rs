use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Event names carried in webhook payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookEvent {
    #[serde(rename = "backup.completed")]
    BackupCompleted,
    #[serde(rename = "backup.failed")]
    BackupFailed,
    #[serde(rename = "backup.deleted")]
    BackupDeleted,
    #[serde(rename = "test.ping")]
    TestPing,
}

impl WebhookEvent {
    /// Events a webhook configuration may subscribe to
    pub const SUBSCRIBABLE: [WebhookEvent; 3] = [
        WebhookEvent::BackupCompleted,
        WebhookEvent::BackupFailed,
        WebhookEvent::BackupDeleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WebhookEvent::BackupCompleted => "backup.completed",
            WebhookEvent::BackupFailed => "backup.failed",
            WebhookEvent::BackupDeleted => "backup.deleted",
            WebhookEvent::TestPing => "test.ping",
        }
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebhookEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backup.completed" => Ok(WebhookEvent::BackupCompleted),
            "backup.failed" => Ok(WebhookEvent::BackupFailed),
            "backup.deleted" => Ok(WebhookEvent::BackupDeleted),
            "test.ping" => Ok(WebhookEvent::TestPing),
            other => Err(format!("Unknown webhook event: {other}")),
        }
    }
}

/// User-configured HTTP callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WebhookConfig {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub webhook_url: String,
    pub events: Vec<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookConfig {
    pub fn subscribes_to(&self, event: WebhookEvent) -> bool {
        self.enabled && self.events.iter().any(|e| e == event.as_str())
    }
}

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Success => "success",
            DeliveryStatus::Failed => "failed",
        }
    }
}

/// Append-only record of a webhook delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WebhookLog {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub event_type: String,
    pub status: String,
    pub response_code: Option<i32>,
    pub error_message: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_round_trip_through_from_str() {
        for event in WebhookEvent::SUBSCRIBABLE {
            assert_eq!(event.as_str().parse::<WebhookEvent>().unwrap(), event);
        }
        assert!("backup.started".parse::<WebhookEvent>().is_err());
    }

    #[test]
    fn test_disabled_webhook_subscribes_to_nothing() {
        let now = Utc::now();
        let mut webhook = WebhookConfig {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "ops".to_string(),
            webhook_url: "https://example.com/hook".to_string(),
            events: vec!["backup.failed".to_string()],
            enabled: true,
            created_at: now,
            updated_at: now,
        };

        assert!(webhook.subscribes_to(WebhookEvent::BackupFailed));
        assert!(!webhook.subscribes_to(WebhookEvent::BackupCompleted));

        webhook.enabled = false;
        assert!(!webhook.subscribes_to(WebhookEvent::BackupFailed));
    }
}
