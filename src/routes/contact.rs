use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::email::ContactMessage;
use crate::error::{AppError, Result};
use crate::routes::validation::ValidJson;
use crate::AppState;

/// `POST /send-contact-email`: no authentication
pub async fn send_contact_email(
    State(state): State<AppState>,
    ValidJson(message): ValidJson<ContactMessage>,
) -> Result<Json<Value>> {
    let message = message.validated()?;

    let mailer = state
        .mailer()
        .ok_or_else(|| AppError::Upstream("Email service not configured".to_string()))?;

    tracing::info!(subject = %message.subject, "Contact form submitted");
    let (user_email, support_email) = mailer.send_contact(&message).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Email sent successfully",
        "userEmail": user_email,
        "supportEmail": support_email,
    })))
}
