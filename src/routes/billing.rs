use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::billing::{self, StripeEvent};
use crate::constants::STRIPE_SIGNATURE_TOLERANCE_SECS;
use crate::error::{AppError, Result};
use crate::routes::validation::parse_json;
use crate::security::verify_stripe_signature;
use crate::AppState;

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// `POST /stripe-webhook`
///
/// The signature covers the raw body, so the body is taken as bytes and only
/// decoded after verification.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::Upstream("Missing Stripe configuration".to_string()))?;

    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::validation("Missing stripe-signature header"))?;

    if !verify_stripe_signature(&body, signature, secret, STRIPE_SIGNATURE_TOLERANCE_SECS) {
        tracing::warn!("Stripe webhook signature rejected");
        return Err(AppError::InvalidSignature);
    }

    let event: StripeEvent = parse_json(&body)?;
    let outcome = billing::handle_event(&state, event).await?;
    tracing::info!(?outcome, "Stripe event processed");

    Ok(Json(json!({ "received": true })))
}
