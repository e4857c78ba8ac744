use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::ApiKeyUser;
use crate::error::{AppError, Result};
use crate::lifecycle::{self, InitUpload};
use crate::models::Backup;
use crate::routes::validation::{parse_json, require_uuid};
use crate::AppState;

pub const HA_VERSION_HEADER: &str = "x-ha-version";

/// Query string of `POST /backup-upload`
#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub action: Option<String>,
    pub backup_id: Option<String>,
    pub chunk_number: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BackupIdBody {
    backup_id: Option<String>,
    error_message: Option<String>,
}

/// A lifecycle request, decoded from the action and its inputs
#[derive(Debug)]
pub enum UploadCommand {
    Init(InitUpload),
    Chunk {
        backup_id: Uuid,
        chunk_number: u32,
        offset: u64,
        data: Bytes,
    },
    Complete {
        backup_id: Uuid,
    },
    Fail {
        backup_id: Uuid,
        error_message: Option<String>,
    },
}

fn parse_number<T: std::str::FromStr>(field: &str, value: Option<&str>) -> Result<T> {
    value
        .ok_or_else(|| AppError::validation("Missing required parameters"))?
        .trim()
        .parse()
        .map_err(|_| AppError::validation(format!("Invalid {field}")))
}

impl UploadCommand {
    /// Decode the request. A missing action means `init`.
    pub fn parse(query: UploadQuery, body: Bytes) -> Result<Self> {
        match query.action.as_deref().unwrap_or("init") {
            "init" => Ok(UploadCommand::Init(parse_json(&body)?)),
            "chunk" => {
                if query.backup_id.is_none() {
                    return Err(AppError::validation("Missing required parameters"));
                }
                Ok(UploadCommand::Chunk {
                    backup_id: require_uuid("backup_id", query.backup_id.as_deref())?,
                    chunk_number: parse_number("chunk_number", query.chunk_number.as_deref())?,
                    offset: parse_number("offset", query.offset.as_deref())?,
                    data: body,
                })
            }
            "complete" => {
                let body: BackupIdBody = parse_json(&body)?;
                Ok(UploadCommand::Complete {
                    backup_id: require_uuid("backup_id", body.backup_id.as_deref())?,
                })
            }
            "fail" => {
                let body: BackupIdBody = parse_json(&body)?;
                Ok(UploadCommand::Fail {
                    backup_id: require_uuid("backup_id", body.backup_id.as_deref())?,
                    error_message: body.error_message,
                })
            }
            _ => Err(AppError::validation("Invalid action")),
        }
    }
}

/// `POST /backup-upload?action=init|chunk|complete|fail`
pub async fn upload_action(
    State(state): State<AppState>,
    ApiKeyUser(user_id): ApiKeyUser,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<Value>> {
    let command = UploadCommand::parse(query, body)?;

    let response = match command {
        UploadCommand::Init(request) => {
            let backup = lifecycle::init_upload(&state, user_id, request).await?;
            json!({
                "success": true,
                "backup_id": backup.id,
                "storage_path": backup.storage_path,
            })
        }
        UploadCommand::Chunk {
            backup_id,
            chunk_number,
            offset,
            data,
        } => {
            let stored =
                lifecycle::write_chunk(&state, user_id, backup_id, chunk_number, offset, data)
                    .await?;
            json!({ "success": true, "bytes_stored": stored })
        }
        UploadCommand::Complete { backup_id } => {
            lifecycle::complete_upload(&state, user_id, backup_id).await?;
            json!({ "success": true, "message": "Upload completed" })
        }
        UploadCommand::Fail {
            backup_id,
            error_message,
        } => {
            lifecycle::fail_upload(&state, user_id, backup_id, error_message).await?;
            json!({ "success": true, "message": "Upload marked as failed" })
        }
    };

    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct StreamUploadResponse {
    pub success: bool,
    pub backup: Backup,
}

/// `PUT /backup-upload`: whole archive in the body, version in `x-ha-version`
pub async fn upload_stream(
    State(state): State<AppState>,
    ApiKeyUser(user_id): ApiKeyUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StreamUploadResponse>> {
    let ha_version = headers
        .get(HA_VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    tracing::info!(%user_id, bytes = body.len(), "Streaming upload received");
    let backup = lifecycle::upload_whole(&state, user_id, body, ha_version).await?;

    Ok(Json(StreamUploadResponse {
        success: true,
        backup,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(action: &str) -> UploadQuery {
        UploadQuery {
            action: Some(action.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_action_is_init() {
        let command = UploadCommand::parse(
            UploadQuery::default(),
            Bytes::from_static(br#"{"file_size": 1024, "backup_trigger": "scheduled"}"#),
        )
        .unwrap();

        match command {
            UploadCommand::Init(init) => {
                assert_eq!(init.file_size, Some(1024));
                assert_eq!(init.backup_trigger, crate::models::BackupTrigger::Scheduled);
            }
            other => panic!("expected init, got {other:?}"),
        }
    }

    #[test]
    fn test_chunk_requires_all_parameters() {
        let id = Uuid::new_v4();
        let mut q = query("chunk");
        q.backup_id = Some(id.to_string());
        q.chunk_number = Some("0".to_string());

        let err = UploadCommand::parse(q, Bytes::new()).unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameters");
    }

    #[test]
    fn test_chunk_parses() {
        let id = Uuid::new_v4();
        let q = UploadQuery {
            action: Some("chunk".to_string()),
            backup_id: Some(id.to_string()),
            chunk_number: Some("2".to_string()),
            offset: Some("2048".to_string()),
        };

        match UploadCommand::parse(q, Bytes::from_static(b"abc")).unwrap() {
            UploadCommand::Chunk {
                backup_id,
                chunk_number,
                offset,
                data,
            } => {
                assert_eq!(backup_id, id);
                assert_eq!(chunk_number, 2);
                assert_eq!(offset, 2048);
                assert_eq!(&data[..], b"abc");
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_action_rejected() {
        let err = UploadCommand::parse(query("resume"), Bytes::new()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid action");
    }

    #[test]
    fn test_fractional_file_size_rejected() {
        let err = UploadCommand::parse(query("init"), Bytes::from_static(br#"{"file_size": 1.5}"#))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
