//! S3-compatible object storage implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{Attribute, Attributes, ObjectStore, PutMode, PutOptions, PutPayload};
use tracing::info;
use url::Url;

use crate::domain::entities::ObjectCredential;
use crate::domain::repositories::object_client::{
    ObjectClient, ObjectInfo, StorageError, StorageResult,
};

/// Advisory metadata key recording an object's intended expiry.
const EXPIRES_METADATA_KEY: &str = "expires-at";

/// How presigned URLs are produced for this backend.
enum Signing {
    /// No URL generation possible (plain in-memory backend).
    Disabled,
    /// Plain path-style URLs without a signature, for development and
    /// tests where the backend enforces no auth.
    Unsigned { endpoint: Url, bucket: String },
    /// Real SigV4 presigning. Computed locally, no network round trip.
    S3 {
        signer: Arc<AmazonS3>,
        endpoint: Url,
        bucket: String,
        region: String,
        allow_http: bool,
    },
}

/// Object client over an S3-compatible bucket.
///
/// Production construction is [`ObjectStorage::s3`]; tests use
/// [`ObjectStorage::memory`] or [`ObjectStorage::memory_with_endpoint`].
/// The client is cheap to share behind an `Arc` and safe for concurrent
/// use.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    signing: Signing,
}

impl ObjectStorage {
    /// Connects to an S3-compatible endpoint with path-style addressing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the client cannot be built from the
    /// given settings. No network call is made here; reachability is
    /// checked by [`ObjectClient::health_check`].
    pub fn s3(
        endpoint: &Url,
        bucket: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        allow_http: bool,
    ) -> StorageResult<Self> {
        let s3 = build_s3(endpoint, bucket, region, access_key, secret_key, allow_http)?;
        let signer = Arc::new(s3);
        let store: Arc<dyn ObjectStore> = signer.clone();

        info!("✓ Object storage ready at {} (bucket: {})", endpoint, bucket);

        Ok(Self {
            store,
            signing: Signing::S3 {
                signer,
                endpoint: endpoint.clone(),
                bucket: bucket.to_string(),
                region: region.to_string(),
                allow_http,
            },
        })
    }

    /// In-memory backend with no URL generation.
    pub fn memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            signing: Signing::Disabled,
        }
    }

    /// In-memory backend that produces unsigned path-style URLs.
    ///
    /// Lets development setups and tests exercise the upload and redirect
    /// flows, which need a URL-shaped target, without a real bucket.
    pub fn memory_with_endpoint(endpoint: &Url, bucket: &str) -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            signing: Signing::Unsigned {
                endpoint: endpoint.clone(),
                bucket: bucket.to_string(),
            },
        }
    }
}

#[async_trait]
impl ObjectClient for ObjectStorage {
    async fn stat_exists(&self, name: &str) -> StorageResult<bool> {
        match self.store.head(&Path::from(name)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn put(
        &self,
        name: &str,
        data: Bytes,
        expires_at: Option<DateTime<Utc>>,
    ) -> StorageResult<()> {
        let mut attributes = Attributes::new();
        if let Some(expires) = expires_at {
            attributes.insert(
                Attribute::Metadata(EXPIRES_METADATA_KEY.into()),
                expires.to_rfc3339().into(),
            );
        }

        let options = PutOptions {
            mode: PutMode::Create,
            attributes,
            ..Default::default()
        };

        match self
            .store
            .put_opts(&Path::from(name), PutPayload::from(data), options)
            .await
        {
            Ok(_) => Ok(()),
            Err(object_store::Error::AlreadyExists { .. }) => Err(StorageError::AlreadyExists),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        match self.store.delete(&Path::from(name)).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn list_all(&self) -> BoxStream<'static, StorageResult<ObjectInfo>> {
        self.store
            .list(None)
            .map(|item| {
                item.map(|meta| ObjectInfo {
                    name: meta.location.to_string(),
                    last_modified: meta.last_modified,
                    size: meta.size,
                })
                .map_err(|e| StorageError::Io(e.to_string()))
            })
            .boxed()
    }

    async fn presign_get(
        &self,
        name: &str,
        ttl: Duration,
        credential: Option<ObjectCredential>,
    ) -> StorageResult<String> {
        match &self.signing {
            Signing::Disabled => Err(StorageError::PresignUnsupported),
            Signing::Unsigned { endpoint, bucket } => {
                let mut url = endpoint
                    .join(&format!("{}/{}", bucket, name))
                    .map_err(|e| StorageError::Io(e.to_string()))?;
                url.query_pairs_mut()
                    .append_pair("expires", &ttl.as_secs().to_string());
                Ok(url.to_string())
            }
            Signing::S3 {
                signer,
                endpoint,
                bucket,
                region,
                allow_http,
            } => {
                let path = Path::from(name);
                let url = match credential {
                    None => signer
                        .signed_url(Method::GET, &path, ttl)
                        .await
                        .map_err(|e| StorageError::Io(e.to_string()))?,
                    Some(credential) => {
                        let scoped = build_s3(
                            endpoint,
                            bucket,
                            region,
                            &credential.access,
                            &credential.secret,
                            *allow_http,
                        )?;
                        scoped
                            .signed_url(Method::GET, &path, ttl)
                            .await
                            .map_err(|e| StorageError::Io(e.to_string()))?
                    }
                };
                Ok(url.to_string())
            }
        }
    }

    async fn health_check(&self) -> bool {
        // A missing probe object still proves the bucket answers.
        match self.store.head(&Path::from(".healthcheck")).await {
            Ok(_) => true,
            Err(object_store::Error::NotFound { .. }) => true,
            Err(_) => false,
        }
    }
}

/// Builds a path-style S3 client for the given credentials.
///
/// Also used per presign call when a caller-scoped credential overrides
/// the service one; construction is local and cheap.
fn build_s3(
    endpoint: &Url,
    bucket: &str,
    region: &str,
    access_key: &str,
    secret_key: &str,
    allow_http: bool,
) -> StorageResult<AmazonS3> {
    AmazonS3Builder::new()
        .with_endpoint(endpoint.as_str().trim_end_matches('/'))
        .with_bucket_name(bucket)
        .with_region(region)
        .with_access_key_id(access_key)
        .with_secret_access_key(secret_key)
        .with_allow_http(allow_http)
        .with_virtual_hosted_style_request(false) // MinIO requires path-style URLs
        .build()
        .map_err(|e| StorageError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_put_then_stat() {
        let storage = ObjectStorage::memory();
        storage
            .put("report.pdf", Bytes::from_static(b"content"), None)
            .await
            .unwrap();

        assert!(storage.stat_exists("report.pdf").await.unwrap());
        assert!(!storage.stat_exists("other.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_refuses_to_clobber() {
        let storage = ObjectStorage::memory();
        storage
            .put("report.pdf", Bytes::from_static(b"first"), None)
            .await
            .unwrap();

        let err = storage
            .put("report.pdf", Bytes::from_static(b"second"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let storage = ObjectStorage::memory();
        storage
            .put("report.pdf", Bytes::from_static(b"content"), None)
            .await
            .unwrap();

        storage.delete("report.pdf").await.unwrap();
        storage.delete("report.pdf").await.unwrap();
        assert!(!storage.stat_exists("report.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_all_reports_names() {
        let storage = ObjectStorage::memory();
        storage
            .put("a.pdf", Bytes::from_static(b"a"), None)
            .await
            .unwrap();
        storage
            .put("b.png", Bytes::from_static(b"bb"), None)
            .await
            .unwrap();

        let mut names: Vec<String> = storage
            .list_all()
            .map_ok(|info| info.name)
            .try_collect()
            .await
            .unwrap();
        names.sort();

        assert_eq!(names, vec!["a.pdf".to_string(), "b.png".to_string()]);
    }

    #[tokio::test]
    async fn test_presign_disabled_backend() {
        let storage = ObjectStorage::memory();
        let err = storage
            .presign_get("report.pdf", Duration::from_secs(60), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::PresignUnsupported));
    }

    #[tokio::test]
    async fn test_unsigned_urls_are_path_style() {
        let endpoint = Url::parse("http://minio.internal:9000").unwrap();
        let storage = ObjectStorage::memory_with_endpoint(&endpoint, "shortlink");

        let url = storage
            .presign_get("report.pdf", Duration::from_secs(60), None)
            .await
            .unwrap();
        assert!(url.starts_with("http://minio.internal:9000/shortlink/report.pdf"));
        assert!(url.contains("expires=60"));
    }

    #[tokio::test]
    async fn test_health_check_on_empty_bucket() {
        let storage = ObjectStorage::memory();
        assert!(storage.health_check().await);
    }
}
