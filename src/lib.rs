//! HomeSafe Backup server
//!
//! Quota-gated backup uploads with a status lifecycle, replication to
//! customer S3 or Dropbox targets, webhooks and Stripe-driven plans.
//! `AppState::connect` picks Postgres or the in-memory backend from config.

pub mod auth;
pub mod billing;
pub mod config;
pub mod constants;
pub mod db;
pub mod email;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod quota;
pub mod replication;
pub mod routes;
pub mod security;
pub mod storage;
pub mod webhooks;

pub use config::Config;
pub use db::{Db, Store};
pub use error::{AppError, Result};
pub use storage::{ObjectStorage, Storage};

use std::sync::Arc;

use auth::{DenyAllSessions, Sessions, SupabaseAuth};
use billing::StripeClient;
use db::{connect_pool, MemoryStore, PgStore};
use email::ResendMailer;
use storage::{MemoryStorage, SupabaseStorage};
use webhooks::Notifier;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub storage: Storage,
    pub sessions: Sessions,
    pub http: reqwest::Client,
    pub config: Config,
}

impl AppState {
    /// Create a new AppState from already constructed backends
    pub fn new(db: Db, storage: Storage, sessions: Sessions, config: Config) -> Self {
        Self {
            db,
            storage,
            sessions,
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Connect the backends named by `config`
    ///
    /// `DATABASE_URL=memory` selects the in-process store and storage and
    /// runs no migrations.
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("homesafe-backup-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let sessions: Sessions = if config.supabase_url.is_empty() {
            tracing::warn!("SUPABASE_URL not set, session authentication disabled");
            Arc::new(DenyAllSessions)
        } else {
            Arc::new(SupabaseAuth::new(
                http.clone(),
                &config.supabase_url,
                &config.supabase_anon_key,
            ))
        };

        let (db, storage): (Db, Storage) = if config.uses_memory_store() {
            tracing::warn!("Using in-memory store and storage; data is lost on restart");
            (Arc::new(MemoryStore::new()), Arc::new(MemoryStorage::new()))
        } else {
            let pool = connect_pool(&config).await?;

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Migrations complete");

            let storage = SupabaseStorage::new(
                http.clone(),
                &config.supabase_url,
                &config.supabase_service_role_key,
                &config.storage_bucket,
            );
            (Arc::new(PgStore::new(pool)), Arc::new(storage))
        };

        Ok(Self {
            db,
            storage,
            sessions,
            http,
            config,
        })
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::new(self.db.clone(), self.http.clone(), self.config.webhook_timeout())
    }

    /// Stripe API client, when a secret key is configured
    pub fn stripe(&self) -> Option<StripeClient> {
        self.config
            .stripe_secret_key
            .as_deref()
            .map(|key| StripeClient::new(self.http.clone(), &self.config.stripe_api_base, key))
    }

    /// Resend client, when an API key is configured
    pub fn mailer(&self) -> Option<ResendMailer> {
        self.config.resend_api_key.as_deref().map(|key| {
            ResendMailer::new(
                self.http.clone(),
                &self.config.resend_api_base,
                key,
                &self.config.email_from,
                &self.config.support_email,
            )
        })
    }
}
