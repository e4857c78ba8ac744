use chrono::Utc;
use uuid::Uuid;

use crate::constants::{ERR_API_KEY_NOT_FOUND, ERR_INVALID_API_KEY};
use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{ApiKey, BackupLog, LogAction, LogStatus};
use crate::security::{generate_api_key, hash_api_key};

/// Resolve a plaintext `x-api-key` to its owner
///
/// Unknown and revoked keys are indistinguishable to the caller. The
/// `last_used_at` bump runs detached and its failure is only logged.
pub async fn authenticate(db: &Db, presented: &str) -> Result<Uuid> {
    let key_hash = hash_api_key(presented);

    let key = match db.find_api_key_by_hash(&key_hash).await? {
        Some(key) if !key.is_revoked() => key,
        Some(_) => {
            tracing::warn!("Rejected revoked API key");
            return Err(AppError::unauthorized(ERR_INVALID_API_KEY));
        }
        None => return Err(AppError::unauthorized(ERR_INVALID_API_KEY)),
    };

    let db = db.clone();
    let key_id = key.id;
    tokio::spawn(async move {
        if let Err(e) = db.touch_api_key(key_id, Utc::now()).await {
            tracing::warn!(%key_id, "Failed to update API key last_used_at: {}", e);
        }
    });

    Ok(key.user_id)
}

/// A freshly issued key; `key` is the only copy of the plaintext
#[derive(Debug)]
pub struct IssuedKey {
    pub record: ApiKey,
    pub key: String,
}

pub async fn issue(db: &Db, user_id: Uuid, name: &str) -> Result<IssuedKey> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("API key name is required"));
    }

    let key = generate_api_key();
    let record = ApiKey::new(user_id, name.to_string(), hash_api_key(&key), Utc::now());
    db.insert_api_key(&record).await?;

    db.insert_backup_log(&BackupLog::new(
        user_id,
        LogAction::ApiKeyCreate,
        LogStatus::Success,
        format!("API key created: {}", record.name),
    ))
    .await?;

    tracing::info!(%user_id, key_id = %record.id, "API key issued");
    Ok(IssuedKey { record, key })
}

/// Tombstone one of the caller's keys
pub async fn revoke(db: &Db, user_id: Uuid, key_id: Uuid) -> Result<()> {
    if !db.revoke_api_key(user_id, key_id, Utc::now()).await? {
        return Err(AppError::not_found(ERR_API_KEY_NOT_FOUND));
    }

    db.insert_backup_log(&BackupLog::new(
        user_id,
        LogAction::ApiKeyRevoke,
        LogStatus::Success,
        "API key revoked",
    ))
    .await?;

    tracing::info!(%user_id, %key_id, "API key revoked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use std::sync::Arc;

    fn store() -> Db {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_issued_key_authenticates() {
        let db = store();
        let user_id = Uuid::new_v4();

        let issued = issue(&db, user_id, "  addon  ").await.unwrap();
        assert_eq!(issued.record.name, "addon");
        assert_ne!(issued.record.key_hash, issued.key);

        assert_eq!(authenticate(&db, &issued.key).await.unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_revoked_key_is_rejected() {
        let db = store();
        let user_id = Uuid::new_v4();
        let issued = issue(&db, user_id, "addon").await.unwrap();

        revoke(&db, user_id, issued.record.id).await.unwrap();

        let err = authenticate(&db, &issued.key).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == ERR_INVALID_API_KEY));
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let err = issue(&store(), Uuid::new_v4(), "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_key_is_rejected() {
        let err = authenticate(&store(), "hsb_doesnotexist").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
