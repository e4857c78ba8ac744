use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Long-lived credential used by the Home Assistant add-on
///
/// Only the SHA-256 of the key is stored. Revocation sets `revoked_at`;
/// rows are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub fn new(user_id: Uuid, name: String, key_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            key_hash,
            created_at: now,
            last_used_at: None,
            revoked_at: None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_never_serialized() {
        let key = ApiKey::new(
            Uuid::new_v4(),
            "addon".to_string(),
            "a".repeat(64),
            Utc::now(),
        );
        let value = serde_json::to_value(&key).unwrap();
        assert!(value.get("key_hash").is_none());
        assert_eq!(value["name"], "addon");
        assert!(!key.is_revoked());
    }
}
