use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{ObjectStorage, StorageError};
use crate::constants::BACKUP_CONTENT_TYPE;

/// Supabase Storage client bound to one bucket, authenticated with the service role key
#[derive(Clone)]
pub struct SupabaseStorage {
    http: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl SupabaseStorage {
    pub fn new(http: Client, base_url: &str, service_key: &str, bucket: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            bucket: bucket.to_string(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }
}

/// Map a non-2xx response to a storage error, keeping the provider's message
async fn check(response: Response, path: &str) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(StorageError::NotFound(path.to_string()));
    }
    let message = response.text().await.unwrap_or_default();
    Err(StorageError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(&self, path: &str, data: Bytes, upsert: bool) -> Result<(), StorageError> {
        tracing::debug!(path, bytes = data.len(), upsert, "Uploading object");
        let response = self
            .authed(self.http.post(self.object_url(path)))
            .header("content-type", BACKUP_CONTENT_TYPE)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(data)
            .send()
            .await?;
        check(response, path).await?;
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        let response = self
            .authed(self.http.get(self.object_url(path)))
            .send()
            .await?;
        let response = check(response, path).await?;
        Ok(response.bytes().await?)
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let response = self
            .authed(self.http.delete(url))
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;
        check(response, &paths.join(",")).await?;
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, expires_in: Duration) -> Result<String, StorageError> {
        let url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url, self.bucket, path
        );
        let response = self
            .authed(self.http.post(url))
            .json(&json!({ "expiresIn": expires_in.as_secs() }))
            .send()
            .await?;
        let signed: SignedUrlResponse = check(response, path).await?.json().await?;
        Ok(format!("{}/storage/v1{}", self.base_url, signed.signed_url))
    }
}
