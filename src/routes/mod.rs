pub mod api_keys;
pub mod backup;
pub mod billing;
pub mod contact;
pub mod delete;
pub mod health;
pub mod replicate;
pub mod settings;
pub mod upload;
pub mod validation;
pub mod webhooks;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use health::health_check;

/// Build the full router over `state`
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        // Backups
        .route("/backup-list", get(backup::list_backups))
        .route("/backup-list-api-key", get(backup::list_backups_api_key))
        .route(
            "/backup-upload",
            post(upload::upload_action).put(upload::upload_stream),
        )
        .route("/backup-download", post(backup::download_backup))
        .route("/backup-delete", post(delete::delete_backup))
        .route(
            "/backup-delete/:id",
            post(delete::delete_backup_by_path).delete(delete::delete_backup_by_path),
        )
        .route("/backup-replicate", post(replicate::replicate_backup))
        .route("/backup-logs", get(backup::list_backup_logs))
        // Webhooks
        .route("/webhook-test", post(webhooks::test_webhook))
        .route(
            "/webhooks",
            get(webhooks::list_webhooks).post(webhooks::create_webhook),
        )
        .route(
            "/webhooks/:id",
            put(webhooks::update_webhook).delete(webhooks::delete_webhook),
        )
        .route("/webhooks/:id/logs", get(webhooks::list_webhook_logs))
        // API keys
        .route("/api-key-generate", post(api_keys::generate_key))
        .route("/api-keys", get(api_keys::list_keys))
        .route("/api-key-revoke", post(api_keys::revoke_key))
        // Settings, billing, contact
        .route(
            "/user-settings",
            get(settings::get_settings).post(settings::update_settings),
        )
        .route("/stripe-webhook", post(billing::stripe_webhook))
        .route("/send-contact-email", post(contact::send_contact_email))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
