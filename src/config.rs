use std::{env, time::Duration};

use crate::billing::PriceMap;

/// `DATABASE_URL` value selecting the in-process store and storage
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub supabase_anon_key: String,
    pub storage_bucket: String,
    pub signed_url_expiry_secs: u64,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_api_base: String,
    pub stripe_price_pro: String,
    pub stripe_price_business: String,
    pub resend_api_key: Option<String>,
    pub resend_api_base: String,
    pub support_email: String,
    pub email_from: String,
    pub webhook_timeout_secs: u64,
    pub dropbox_content_url: String,
    pub max_upload_bytes: usize,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match optional(name) {
        Some(raw) => raw.trim().parse().map_err(|_| format!("Invalid {name}")),
        None => Ok(default),
    }
}

impl Config {
    /// Read the process environment, after merging a `.env` file when present
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url = optional("DATABASE_URL")
            .ok_or_else(|| "DATABASE_URL must be set (or \"memory\")".to_string())?;

        let supabase_url = var_or("SUPABASE_URL", "");
        let supabase_service_role_key = var_or("SUPABASE_SERVICE_ROLE_KEY", "");
        if database_url != MEMORY_DATABASE_URL
            && (supabase_url.is_empty() || supabase_service_role_key.is_empty())
        {
            return Err("SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY must be set".to_string());
        }

        let defaults = Config::in_memory();

        Ok(Config {
            server_host: var_or("SERVER_HOST", "0.0.0.0"),
            server_port: parsed("SERVER_PORT", 8080)?,
            database_url,
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 10)?,
            allowed_origins: var_or("ALLOWED_ORIGINS", "http://localhost:5173")
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            environment: var_or("ENVIRONMENT", "development"),
            supabase_url,
            supabase_service_role_key,
            supabase_anon_key: var_or("SUPABASE_ANON_KEY", ""),
            storage_bucket: var_or("STORAGE_BUCKET", &defaults.storage_bucket),
            signed_url_expiry_secs: parsed("SIGNED_URL_EXPIRY_SECS", defaults.signed_url_expiry_secs)?,
            stripe_secret_key: optional("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
            stripe_api_base: var_or("STRIPE_API_BASE", &defaults.stripe_api_base),
            stripe_price_pro: var_or("STRIPE_PRICE_PRO", &defaults.stripe_price_pro),
            stripe_price_business: var_or("STRIPE_PRICE_BUSINESS", &defaults.stripe_price_business),
            resend_api_key: optional("RESEND_API_KEY"),
            resend_api_base: var_or("RESEND_API_BASE", &defaults.resend_api_base),
            support_email: var_or("SUPPORT_EMAIL", &defaults.support_email),
            email_from: var_or("EMAIL_FROM", &defaults.email_from),
            webhook_timeout_secs: parsed("WEBHOOK_TIMEOUT_SECS", defaults.webhook_timeout_secs)?,
            dropbox_content_url: var_or("DROPBOX_CONTENT_URL", &defaults.dropbox_content_url),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", 6 * 1024 * 1024 * 1024)?,
        })
    }

    /// Defaults for an in-memory deployment; tests override individual fields
    pub fn in_memory() -> Self {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            database_url: MEMORY_DATABASE_URL.to_string(),
            db_max_connections: 1,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            environment: "test".to_string(),
            supabase_url: String::new(),
            supabase_service_role_key: String::new(),
            supabase_anon_key: String::new(),
            storage_bucket: "backups".to_string(),
            signed_url_expiry_secs: 3600,
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            stripe_api_base: "https://api.stripe.com".to_string(),
            stripe_price_pro: "price_1SEXIeFaQO1xoKuji0E6sEEK".to_string(),
            stripe_price_business: "price_1SEXJ5FaQO1xoKujo8uBFZTj".to_string(),
            resend_api_key: None,
            resend_api_base: "https://api.resend.com".to_string(),
            support_email: "support@homesafe.com".to_string(),
            email_from: "HomeSafe <onboarding@resend.dev>".to_string(),
            webhook_timeout_secs: 10,
            dropbox_content_url: "https://content.dropboxapi.com".to_string(),
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }

    pub fn price_map(&self) -> PriceMap {
        PriceMap {
            pro: self.stripe_price_pro.clone(),
            business: self.stripe_price_business.clone(),
        }
    }

    pub fn signed_url_expiry(&self) -> Duration {
        Duration::from_secs(self.signed_url_expiry_secs)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }

    /// `host:port` to bind
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_falls_back_when_unset_or_blank() {
        assert_eq!(parsed("HSB_TEST_UNSET_PORT", 8080u16), Ok(8080));

        env::set_var("HSB_TEST_BLANK_PORT", "   ");
        assert_eq!(parsed("HSB_TEST_BLANK_PORT", 8080u16), Ok(8080));
    }

    #[test]
    fn test_parsed_rejects_garbage() {
        env::set_var("HSB_TEST_BAD_TIMEOUT", "ten");
        assert_eq!(
            parsed::<u64>("HSB_TEST_BAD_TIMEOUT", 10),
            Err("Invalid HSB_TEST_BAD_TIMEOUT".to_string())
        );

        env::set_var("HSB_TEST_GOOD_TIMEOUT", " 25 ");
        assert_eq!(parsed::<u64>("HSB_TEST_GOOD_TIMEOUT", 10), Ok(25));
    }

    #[test]
    fn test_in_memory_defaults() {
        let config = Config::in_memory();

        assert!(config.uses_memory_store());
        assert_eq!(config.server_address(), "127.0.0.1:0");
        assert_eq!(config.webhook_timeout(), Duration::from_secs(10));
        assert!(config.stripe_webhook_secret.is_none());
    }
}
