//! Contact form relay through the Resend HTTP API.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::constants::{
    CONTACT_EMAIL_MAX, CONTACT_MESSAGE_MAX, CONTACT_NAME_MAX, CONTACT_SUBJECT_MAX,
};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len == 0 {
        return Err(AppError::validation(format!("{field} is required")));
    }
    if len > max {
        return Err(AppError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

impl ContactMessage {
    /// Trim every field and enforce the form limits
    pub fn validated(self) -> Result<Self> {
        let message = Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
        };

        check_length("Name", &message.name, CONTACT_NAME_MAX)?;
        check_length("Email", &message.email, CONTACT_EMAIL_MAX)?;
        if !is_valid_email(&message.email) {
            return Err(AppError::validation("Invalid email address"));
        }
        check_length("Subject", &message.subject, CONTACT_SUBJECT_MAX)?;
        check_length("Message", &message.message, CONTACT_MESSAGE_MAX)?;

        Ok(message)
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn confirmation_html(msg: &ContactMessage) -> String {
    let name = escape_html(&msg.name);
    let subject = escape_html(&msg.subject);
    let body = escape_html(&msg.message);
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="color: #2563eb;">Thank you for contacting us, {name}!</h1>
  <p>We have received your message and will get back to you soon.</p>
  <div style="background-color: #f3f4f6; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <h3 style="margin-top: 0;">Summary of your message:</h3>
    <p><strong>Subject:</strong> {subject}</p>
    <p style="white-space: pre-wrap;">{body}</p>
  </div>
  <p>Expected response time:</p>
  <ul>
    <li><strong>Free:</strong> Community support (best effort)</li>
    <li><strong>Pro:</strong> 48h business days</li>
    <li><strong>Business:</strong> 24h business days</li>
  </ul>
  <p style="color: #6b7280; font-size: 14px;">Best regards,<br><strong>HomeSafe Team</strong></p>
</div>"#
    )
}

fn support_html(msg: &ContactMessage) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="color: #2563eb;">New contact form message</h1>
  <p><strong>From:</strong> {} ({})</p>
  <p><strong>Subject:</strong> {}</p>
  <p style="white-space: pre-wrap;">{}</p>
</div>"#,
        escape_html(&msg.name),
        escape_html(&msg.email),
        escape_html(&msg.subject),
        escape_html(&msg.message),
    )
}

/// Resend client (`POST /emails`)
#[derive(Clone)]
pub struct ResendMailer {
    http: Client,
    api_base: String,
    api_key: String,
    from: String,
    support_email: String,
}

impl ResendMailer {
    pub fn new(http: Client, api_base: &str, api_key: &str, from: &str, support_email: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
            support_email: support_email.to_string(),
        }
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> Result<Value> {
        let response = self
            .http
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Email provider unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Email provider returned {status}: {text}")));
        }
        Ok(response.json().await.unwrap_or(Value::Null))
    }

    /// Confirmation to the sender, then notification to support
    pub async fn send_contact(&self, msg: &ContactMessage) -> Result<(Value, Value)> {
        let user = self
            .send(&msg.email, "We received your message!", confirmation_html(msg))
            .await?;
        tracing::info!("Contact confirmation email sent");

        let support = self
            .send(
                &self.support_email,
                &format!("[Contact Form] {}", msg.subject),
                support_html(msg),
            )
            .await?;
        tracing::info!("Support notification email sent");

        Ok((user, support))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> ContactMessage {
        ContactMessage {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            subject: "Restore help".to_string(),
            message: "My restore fails".to_string(),
        }
    }

    #[test]
    fn test_valid_message_is_trimmed() {
        let mut msg = message();
        msg.name = "  Ana  ".to_string();
        assert_eq!(msg.validated().unwrap().name, "Ana");
    }

    #[test]
    fn test_field_limits() {
        let mut msg = message();
        msg.name = "x".repeat(101);
        assert!(msg.validated().is_err());

        let mut msg = message();
        msg.subject = "   ".to_string();
        assert!(msg.validated().is_err());

        let mut msg = message();
        msg.message = "x".repeat(2000);
        assert!(msg.validated().is_ok());

        let mut msg = message();
        msg.message = "x".repeat(2001);
        assert!(msg.validated().is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@@b.co"));
    }

    #[test]
    fn test_user_content_is_escaped() {
        let mut msg = message();
        msg.message = "<script>alert('x')</script>".to_string();
        let html = support_html(&msg);

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
    }
}
