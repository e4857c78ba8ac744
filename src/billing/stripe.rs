use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};

use crate::error::{AppError, Result};

/// Minimal Stripe REST client for the two lookups checkout needs
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub price: Price,
    /// Newer API versions report the period on the item
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemList {
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub items: ItemList,
    pub current_period_end: Option<i64>,
}

impl StripeSubscription {
    pub fn first_price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }

    pub fn period_end(&self) -> Option<DateTime<Utc>> {
        self.current_period_end
            .or_else(|| self.items.data.first().and_then(|i| i.current_period_end))
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

impl StripeClient {
    pub fn new(http: Client, api_base: &str, secret_key: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}/v1/{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Stripe returned {status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed Stripe response: {e}")))
    }

    pub async fn retrieve_customer(&self, id: &str) -> Result<Customer> {
        self.get(&format!("customers/{id}")).await
    }

    pub async fn retrieve_subscription(&self, id: &str) -> Result<StripeSubscription> {
        self.get(&format!("subscriptions/{id}")).await
    }
}
