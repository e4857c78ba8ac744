//! Webhook configuration and test dispatch.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::constants::{ERR_WEBHOOK_NOT_FOUND, WEBHOOK_LOG_LIMIT};
use crate::error::{AppError, Result};
use crate::models::{WebhookConfig, WebhookEvent, WebhookLog};
use crate::routes::validation::{is_http_url, require_text, require_uuid, ValidJson};
use crate::webhooks::DeliveryOutcome;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WebhookTestRequest {
    pub webhook_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWebhookRequest {
    pub name: Option<String>,
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub events: Vec<String>,
    pub enabled: Option<bool>,
}

/// Partial update; absent fields keep their value
#[derive(Debug, Default, Deserialize)]
pub struct UpdateWebhookRequest {
    pub name: Option<String>,
    pub webhook_url: Option<String>,
    pub events: Option<Vec<String>>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct WebhookListResponse {
    pub webhooks: Vec<WebhookConfig>,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Serialize)]
pub struct WebhookDeletedResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct WebhookLogsResponse {
    pub logs: Vec<WebhookLog>,
}

/// Keep only known subscribable event names, deduplicated in request order
fn parse_events(events: &[String]) -> Result<Vec<String>> {
    let mut parsed: Vec<String> = Vec::with_capacity(events.len());
    for raw in events {
        let event: WebhookEvent = raw.trim().parse().map_err(AppError::Validation)?;
        if !WebhookEvent::SUBSCRIBABLE.contains(&event) {
            return Err(AppError::validation(format!(
                "Event cannot be subscribed to: {event}"
            )));
        }
        if !parsed.iter().any(|e| e == event.as_str()) {
            parsed.push(event.as_str().to_string());
        }
    }
    Ok(parsed)
}

fn validate_url(url: &str) -> Result<()> {
    if is_http_url(url) {
        Ok(())
    } else {
        Err(AppError::validation("webhook_url must be an http(s) URL"))
    }
}

async fn load_webhook(state: &AppState, user_id: Uuid, raw_id: &str) -> Result<WebhookConfig> {
    let id = require_uuid("webhook_id", Some(raw_id))?;
    state
        .db
        .get_webhook(user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found(ERR_WEBHOOK_NOT_FOUND))
}

/// `POST /webhook-test`: one ping to the caller's webhook
pub async fn test_webhook(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    ValidJson(payload): ValidJson<WebhookTestRequest>,
) -> Result<Json<DeliveryOutcome>> {
    let webhook_id = require_uuid("webhook_id", payload.webhook_id.as_deref())?;
    let webhook = state
        .db
        .get_webhook(user_id, webhook_id)
        .await?
        .ok_or_else(|| AppError::not_found(ERR_WEBHOOK_NOT_FOUND))?;

    let outcome = state.notifier().send_test(&webhook).await?;
    Ok(Json(outcome))
}

pub async fn list_webhooks(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> Result<Json<WebhookListResponse>> {
    let webhooks = state.db.list_webhooks(user_id).await?;
    Ok(Json(WebhookListResponse { webhooks }))
}

pub async fn create_webhook(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    ValidJson(payload): ValidJson<CreateWebhookRequest>,
) -> Result<Json<WebhookResponse>> {
    let name = require_text("name", payload.name.as_deref())?;
    let webhook_url = require_text("webhook_url", payload.webhook_url.as_deref())?;
    validate_url(&webhook_url)?;
    let events = parse_events(&payload.events)?;

    let now = Utc::now();
    let webhook = WebhookConfig {
        id: Uuid::new_v4(),
        user_id,
        name,
        webhook_url,
        events,
        enabled: payload.enabled.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };
    state.db.insert_webhook(&webhook).await?;

    tracing::info!(%user_id, webhook_id = %webhook.id, "Webhook created");
    Ok(Json(WebhookResponse {
        success: true,
        webhook,
    }))
}

pub async fn update_webhook(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateWebhookRequest>,
) -> Result<Json<WebhookResponse>> {
    let mut webhook = load_webhook(&state, user_id, &id).await?;

    if let Some(name) = payload.name.as_deref() {
        webhook.name = require_text("name", Some(name))?;
    }
    if let Some(url) = payload.webhook_url.as_deref() {
        let url = require_text("webhook_url", Some(url))?;
        validate_url(&url)?;
        webhook.webhook_url = url;
    }
    if let Some(events) = payload.events.as_deref() {
        webhook.events = parse_events(events)?;
    }
    if let Some(enabled) = payload.enabled {
        webhook.enabled = enabled;
    }
    webhook.updated_at = Utc::now();

    state.db.update_webhook(&webhook).await?;
    tracing::info!(%user_id, webhook_id = %webhook.id, "Webhook updated");

    Ok(Json(WebhookResponse {
        success: true,
        webhook,
    }))
}

pub async fn delete_webhook(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<String>,
) -> Result<Json<WebhookDeletedResponse>> {
    let id = require_uuid("webhook_id", Some(&id))?;
    if !state.db.delete_webhook(user_id, id).await? {
        return Err(AppError::not_found(ERR_WEBHOOK_NOT_FOUND));
    }

    tracing::info!(%user_id, webhook_id = %id, "Webhook deleted");
    Ok(Json(WebhookDeletedResponse { success: true }))
}

/// Delivery history of one webhook, newest first
pub async fn list_webhook_logs(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<String>,
) -> Result<Json<WebhookLogsResponse>> {
    let webhook = load_webhook(&state, user_id, &id).await?;
    let logs = state
        .db
        .list_webhook_logs(webhook.id, WEBHOOK_LOG_LIMIT)
        .await?;
    Ok(Json(WebhookLogsResponse { logs }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(events: &[&str]) -> Vec<String> {
        events.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_parse_events_dedupes() {
        let parsed =
            parse_events(&names(&["backup.failed", " backup.failed", "backup.deleted"])).unwrap();
        assert_eq!(parsed, names(&["backup.failed", "backup.deleted"]));
    }

    #[test]
    fn test_parse_events_rejects_unknown_and_ping() {
        assert!(parse_events(&names(&["backup.started"])).is_err());
        assert!(parse_events(&names(&["test.ping"])).is_err());
    }
}
