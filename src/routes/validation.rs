use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::AppError;

/// JSON body extractor whose rejections use the service's `{"error": ...}` shape
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        parse_json(&bytes).map(ValidJson)
    }
}

/// Decode a JSON body, reporting malformed input as a validation error
pub fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        AppError::validation(format!("Invalid request body: {e}"))
    })
}

/// Require a present, well-formed UUID field
pub fn require_uuid(field: &str, value: Option<&str>) -> Result<Uuid, AppError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(format!("{field} is required")))?;
    Uuid::parse_str(raw).map_err(|_| AppError::validation(format!("Invalid {field}")))
}

/// Require a non-blank string field, returning it trimmed
pub fn require_text(field: &str, value: Option<&str>) -> Result<String, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::validation(format!("{field} is required")))
}

pub fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/') && !host.contains(char::is_whitespace))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(require_uuid("backupId", Some(&id.to_string())).unwrap(), id);

        let missing = require_uuid("backupId", None).unwrap_err();
        assert_eq!(missing.to_string(), "backupId is required");

        let malformed = require_uuid("backupId", Some("not-a-uuid")).unwrap_err();
        assert_eq!(malformed.to_string(), "Invalid backupId");
    }

    #[test]
    fn test_require_text_trims() {
        assert_eq!(require_text("name", Some("  ops ")).unwrap(), "ops");
        assert!(require_text("name", Some("   ")).is_err());
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://hooks.example.com/ha"));
        assert!(is_http_url("http://10.0.0.2:8123/api/webhook/x"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("example.com"));
    }

    #[test]
    fn test_parse_json_reports_validation() {
        let err = parse_json::<serde_json::Value>(b"{not json").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
