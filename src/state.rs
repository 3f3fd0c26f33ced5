use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::domain::repositories::{KeyStore, ObjectClient};
use crate::utils::object_name::ObjectUrlPolicy;

/// Shared application state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Token key store (Redis in production, in-process otherwise).
    pub store: Arc<dyn KeyStore>,
    /// Object storage client; `None` when no endpoint is configured, which
    /// disables uploads and object-backed redirects keep working off the
    /// stored target.
    pub storage: Option<Arc<dyn ObjectClient>>,
    /// Derivation policy matching targets to objects in the configured
    /// bucket. Present exactly when `storage` is.
    pub policy: Option<ObjectUrlPolicy>,
    /// Public base for short URLs, without a trailing slash.
    pub base_url: String,
    /// SHA-256 digest of the API key. The raw key is not retained.
    pub api_key_digest: [u8; 32],
    pub default_ttl: Duration,
    pub presign_ttl: Duration,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<dyn KeyStore>,
        storage: Option<Arc<dyn ObjectClient>>,
        policy: Option<ObjectUrlPolicy>,
    ) -> Self {
        Self {
            store,
            storage,
            policy,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key_digest: Sha256::digest(config.api_key.as_bytes()).into(),
            default_ttl: config.default_ttl(),
            presign_ttl: config.presign_ttl(),
        }
    }

    /// Builds the public short URL for a token.
    pub fn short_url(&self, token: &str) -> String {
        format!("{}/{}", self.base_url, token)
    }
}
