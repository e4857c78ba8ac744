use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::SessionUser;
use crate::constants::DEFAULT_GITHUB_BRANCH;
use crate::error::{AppError, Result};
use crate::models::UserSettings;
use crate::routes::validation::ValidJson;
use crate::AppState;

/// Fields a client may set. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub s3_enabled: Option<bool>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub dropbox_enabled: Option<bool>,
    pub dropbox_token: Option<String>,
    pub github_enabled: Option<bool>,
    pub github_token: Option<String>,
    pub github_repo: Option<String>,
    pub github_branch: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub settings: UserSettings,
}

fn blank_to_none(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl SettingsUpdate {
    pub fn apply(self, settings: &mut UserSettings) -> Result<()> {
        macro_rules! set_text {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field {
                    settings.$field = blank_to_none(v);
                })*
            };
        }
        set_text!(
            s3_bucket,
            s3_region,
            s3_access_key,
            s3_secret_key,
            dropbox_token,
            github_token,
            github_repo,
            github_branch
        );

        if let Some(v) = self.s3_enabled {
            settings.s3_enabled = v;
        }
        if let Some(v) = self.dropbox_enabled {
            settings.dropbox_enabled = v;
        }
        if let Some(v) = self.github_enabled {
            settings.github_enabled = v;
        }

        if settings.github_enabled {
            if settings.github_token.is_none() || settings.github_repo.is_none() {
                return Err(AppError::validation(
                    "GitHub token and repository are required",
                ));
            }
            if settings.github_branch.is_none() {
                settings.github_branch = Some(DEFAULT_GITHUB_BRANCH.to_string());
            }
        }
        Ok(())
    }
}

/// `GET /user-settings`; users without a row get the empty defaults
pub async fn get_settings(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> Result<Json<SettingsResponse>> {
    let settings = state
        .db
        .get_user_settings(user_id)
        .await?
        .unwrap_or_else(|| UserSettings::empty(user_id, Utc::now()));
    Ok(Json(SettingsResponse { settings }))
}

/// `POST /user-settings`
pub async fn update_settings(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    ValidJson(update): ValidJson<SettingsUpdate>,
) -> Result<Json<SettingsResponse>> {
    let now = Utc::now();
    let mut settings = state
        .db
        .get_user_settings(user_id)
        .await?
        .unwrap_or_else(|| UserSettings::empty(user_id, now));

    update.apply(&mut settings)?;
    settings.updated_at = now;
    state.db.upsert_user_settings(&settings).await?;

    tracing::info!(
        %user_id,
        s3 = settings.s3_enabled,
        dropbox = settings.dropbox_enabled,
        github = settings.github_enabled,
        "User settings saved"
    );
    Ok(Json(SettingsResponse { settings }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_github_branch_defaults_to_main() {
        let mut settings = UserSettings::empty(Uuid::new_v4(), Utc::now());
        SettingsUpdate {
            github_enabled: Some(true),
            github_token: Some("ghp_x".to_string()),
            github_repo: Some("me/ha-config".to_string()),
            ..Default::default()
        }
        .apply(&mut settings)
        .unwrap();

        assert_eq!(settings.github_branch.as_deref(), Some("main"));
    }

    #[test]
    fn test_github_requires_token_and_repo() {
        let mut settings = UserSettings::empty(Uuid::new_v4(), Utc::now());
        let err = SettingsUpdate {
            github_enabled: Some(true),
            github_repo: Some("me/ha-config".to_string()),
            ..Default::default()
        }
        .apply(&mut settings)
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_blank_values_clear_fields() {
        let mut settings = UserSettings::empty(Uuid::new_v4(), Utc::now());
        settings.dropbox_token = Some("sl.old".to_string());
        SettingsUpdate {
            dropbox_token: Some("  ".to_string()),
            ..Default::default()
        }
        .apply(&mut settings)
        .unwrap();
        assert_eq!(settings.dropbox_token, None);
    }
}
