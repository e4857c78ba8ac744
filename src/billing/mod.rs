//! Stripe webhook handling: checkout, plan changes and cancellation.

pub mod stripe;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Plan, PlanUpdate, Subscription};
use crate::AppState;

pub use stripe::{StripeClient, StripeSubscription};

/// Envelope of every Stripe event
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub mode: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
}

/// Stripe price ids of the paid plans
#[derive(Debug, Clone)]
pub struct PriceMap {
    pub pro: String,
    pub business: String,
}

impl PriceMap {
    pub fn plan_for(&self, price_id: &str) -> Option<Plan> {
        if price_id == self.pro {
            Some(Plan::Pro)
        } else if price_id == self.business {
            Some(Plan::Business)
        } else {
            None
        }
    }
}

/// What an event did to the subscriptions table
#[derive(Debug, Clone, PartialEq)]
pub enum BillingOutcome {
    Upserted { plan: Plan },
    Updated { plan: Plan, rows: u64 },
    Downgraded { rows: u64 },
    Ignored,
}

pub async fn handle_event(state: &AppState, event: StripeEvent) -> Result<BillingOutcome> {
    tracing::info!(event_id = ?event.id, event_type = %event.event_type, "Stripe event received");

    let prices = state.config.price_map();
    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSession = serde_json::from_value(event.data.object)?;
            checkout_completed(state, &prices, session).await
        }
        "customer.subscription.updated" => {
            let subscription: StripeSubscription = serde_json::from_value(event.data.object)?;
            let Some(price_id) = subscription.first_price_id() else {
                tracing::warn!(subscription_id = %subscription.id, "Subscription has no items");
                return Ok(BillingOutcome::Ignored);
            };
            let Some(plan) = prices.plan_for(price_id) else {
                tracing::info!(price_id, "Unknown price ID, ignoring update");
                return Ok(BillingOutcome::Ignored);
            };
            let update = PlanUpdate::change(plan, subscription.period_end());
            let rows = state
                .db
                .update_subscription_by_stripe_id(&subscription.id, &update, Utc::now())
                .await?;
            tracing::info!(subscription_id = %subscription.id, ?plan, rows, "Subscription updated");
            Ok(BillingOutcome::Updated { plan, rows })
        }
        "customer.subscription.deleted" => {
            let subscription: StripeSubscription = serde_json::from_value(event.data.object)?;
            let rows = state
                .db
                .update_subscription_by_stripe_id(
                    &subscription.id,
                    &PlanUpdate::downgrade_to_free(),
                    Utc::now(),
                )
                .await?;
            tracing::info!(subscription_id = %subscription.id, rows, "Subscription downgraded to free");
            Ok(BillingOutcome::Downgraded { rows })
        }
        other => {
            tracing::debug!(event_type = other, "Unhandled Stripe event type");
            Ok(BillingOutcome::Ignored)
        }
    }
}

async fn checkout_completed(
    state: &AppState,
    prices: &PriceMap,
    session: CheckoutSession,
) -> Result<BillingOutcome> {
    let (Some(customer_id), Some(subscription_id)) = (&session.customer, &session.subscription)
    else {
        tracing::info!(session_id = %session.id, "Skipping checkout without customer or subscription");
        return Ok(BillingOutcome::Ignored);
    };
    if session.mode.as_deref() != Some("subscription") {
        tracing::info!(session_id = %session.id, "Skipping non-subscription checkout");
        return Ok(BillingOutcome::Ignored);
    }

    let stripe = state
        .stripe()
        .ok_or_else(|| AppError::Upstream("Missing Stripe configuration".to_string()))?;

    let customer = stripe.retrieve_customer(customer_id).await?;
    let email = customer
        .email
        .as_deref()
        .ok_or_else(|| AppError::Upstream("Customer email not found".to_string()))?;

    let user_id = state
        .db
        .find_user_id_by_email(email)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User not found for email: {email}")))?;

    let stripe_subscription = stripe.retrieve_subscription(subscription_id).await?;
    let price_id = stripe_subscription
        .first_price_id()
        .ok_or_else(|| AppError::validation("Subscription has no price"))?;
    let plan = prices
        .plan_for(price_id)
        .ok_or_else(|| AppError::validation(format!("Unknown price ID: {price_id}")))?;

    let now = Utc::now();
    let mut subscription = state
        .db
        .get_subscription(user_id)
        .await?
        .unwrap_or_else(|| Subscription::for_plan(user_id, plan, now));
    subscription.apply_plan(plan);
    subscription.stripe_customer_id = Some(customer.id.clone());
    subscription.stripe_subscription_id = Some(stripe_subscription.id.clone());
    subscription.current_period_end = stripe_subscription.period_end();
    subscription.updated_at = now;

    state.db.upsert_subscription(&subscription).await?;
    tracing::info!(%user_id, ?plan, "Subscription created/updated from checkout");
    Ok(BillingOutcome::Upserted { plan })
}
