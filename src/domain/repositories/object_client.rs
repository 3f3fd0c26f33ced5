//! Object client trait and error types for bucket access.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::domain::entities::ObjectCredential;

/// Errors that can occur against the object store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The object does not exist.
    #[error("Object not found")]
    NotFound,

    /// A conditional put found an object of the same name already present.
    #[error("Object already exists")]
    AlreadyExists,

    /// The backend cannot produce presigned URLs.
    #[error("Presigning not supported by this backend")]
    PresignUnsupported,

    /// Network or backend failure; the operation may succeed if retried.
    #[error("Storage I/O error: {0}")]
    Io(String),
}

/// Result type for object client operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// One object as reported by a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

/// Thin capability surface over the object bucket.
///
/// All names are bare object keys within the configured bucket. The client
/// is process-wide and safe for concurrent use by request handlers and the
/// reconciler.
///
/// # Implementations
///
/// - [`crate::infrastructure::storage::ObjectStorage`] - S3-compatible
///   backend in production, in-memory backend for tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Checks whether an object with this name currently exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] on backend errors.
    async fn stat_exists(&self, name: &str) -> StorageResult<bool>;

    /// Writes an object, refusing to clobber an existing one.
    ///
    /// `expires_at` is recorded as advisory metadata; actual removal is the
    /// reconciler's job once no token references the name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if an object of the same
    /// name is present, and [`StorageError::Io`] on backend errors.
    async fn put(
        &self,
        name: &str,
        data: Bytes,
        expires_at: Option<DateTime<Utc>>,
    ) -> StorageResult<()>;

    /// Deletes an object. Deleting an absent object succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] on backend errors.
    async fn delete(&self, name: &str) -> StorageResult<()>;

    /// Lists every object in the bucket as a lazy stream.
    ///
    /// The listing is finite and restartable; each call starts over. Item
    /// errors surface in the stream so callers can skip and continue.
    fn list_all(&self) -> BoxStream<'static, StorageResult<ObjectInfo>>;

    /// Produces a presigned GET URL for the object.
    ///
    /// Signs with the caller-scoped credential when one is given, otherwise
    /// with the service credential.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PresignUnsupported`] on backends without
    /// signing and [`StorageError::Io`] on signing failures.
    async fn presign_get(
        &self,
        name: &str,
        ttl: Duration,
        credential: Option<ObjectCredential>,
    ) -> StorageResult<String>;

    /// Checks whether the storage backend is reachable.
    ///
    /// Used by health check endpoints to report storage status.
    async fn health_check(&self) -> bool;
}
