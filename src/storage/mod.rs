//! Object storage for backup archives.
//!
//! Production uses the Supabase Storage REST API. Development and tests run
//! against [`MemoryStorage`].

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use memory::MemoryStorage;
pub use supabase::SupabaseStorage;

/// Storage handle type (Arc-wrapped for sharing across handlers)
pub type Storage = Arc<dyn ObjectStorage>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("object not found: {0}")]
    NotFound(String),
}

/// Bucket-scoped object store
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Write `data` at `path`. Without `upsert` an existing object is an error.
    async fn upload(&self, path: &str, data: Bytes, upsert: bool) -> Result<(), StorageError>;

    async fn download(&self, path: &str) -> Result<Bytes, StorageError>;

    /// Remove objects. Missing paths are ignored.
    async fn remove(&self, paths: &[String]) -> Result<(), StorageError>;

    /// Time-limited URL a client can fetch the object from without credentials
    async fn create_signed_url(&self, path: &str, expires_in: Duration) -> Result<String, StorageError>;
}
