#![allow(dead_code)]

use std::sync::Arc;

use shortlink::config::Config;
use shortlink::domain::repositories::{KeyStore, ObjectClient};
use shortlink::infrastructure::keystore::MemoryKeyStore;
use shortlink::infrastructure::storage::ObjectStorage;
use shortlink::state::AppState;
use shortlink::utils::object_name::ObjectUrlPolicy;
use url::Url;

pub const TEST_API_KEY: &str = "test-api-key";
pub const S3_ENDPOINT: &str = "http://minio.test:9000";
pub const S3_BUCKET: &str = "shortlink";

pub fn test_config() -> Config {
    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        base_url: "http://sho.rt".to_string(),
        redis_url: None,
        api_key: TEST_API_KEY.to_string(),
        log_level: "info".to_string(),
        log_format: "text".to_string(),
        behind_proxy: false,
        default_ttl_seconds: 1800,
        s3_endpoint: Some(S3_ENDPOINT.to_string()),
        s3_bucket: S3_BUCKET.to_string(),
        s3_region: "us-east-1".to_string(),
        s3_access_key: "test-access".to_string(),
        s3_secret_key: "test-secret".to_string(),
        s3_allow_http: true,
        s3_presign_ttl_seconds: 604_800,
        reconcile_interval_seconds: 300,
        reconcile_grace_seconds: 900,
        reconcile_timeout_seconds: 300,
    }
}

/// Full state: in-memory key store plus an in-memory bucket that produces
/// unsigned path-style URLs, mirroring a complete deployment.
pub fn create_test_state() -> AppState {
    let config = test_config();
    let endpoint = Url::parse(S3_ENDPOINT).unwrap();
    let policy = ObjectUrlPolicy::new(&endpoint, S3_BUCKET);

    let store: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new(
        config.default_ttl(),
        Some(policy.clone()),
    ));
    let storage: Arc<dyn ObjectClient> =
        Arc::new(ObjectStorage::memory_with_endpoint(&endpoint, S3_BUCKET));

    AppState::new(&config, store, Some(storage), Some(policy))
}

/// State with object storage disabled: uploads unavailable, redirects go
/// straight to the stored target.
pub fn create_test_state_without_storage() -> AppState {
    let mut config = test_config();
    config.s3_endpoint = None;

    let store: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new(config.default_ttl(), None));

    AppState::new(&config, store, None, None)
}

/// Target URL pointing at an object in the test bucket.
pub fn object_url(name: &str) -> String {
    format!("{S3_ENDPOINT}/{S3_BUCKET}/{name}")
}

/// Writes a token straight into the state's store.
pub async fn seed_token(state: &AppState, token: &str, target: &str) {
    state.store.set(token, target, None, false).await.unwrap();
}
