//! HTTP server initialization and runtime setup.
//!
//! Handles key store connection, object storage setup, reconciler spawning,
//! and Axum server lifecycle.

use crate::config::Config;
use crate::domain::reconciler::{ReconcilerConfig, spawn_reconciler};
use crate::domain::repositories::{KeyStore, ObjectClient};
use crate::infrastructure::keystore::{MemoryKeyStore, RedisKeyStore};
use crate::infrastructure::storage::ObjectStorage;
use crate::routes::app_router;
use crate::state::AppState;
use crate::utils::object_name::ObjectUrlPolicy;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_retry::Retry;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{error, info, warn};
use url::Url;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Object storage client and URL policy (when configured)
/// - Redis key store with connect retry (or in-memory fallback)
/// - Background reconciler
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Redis is configured but unreachable after retries
/// - The object storage endpoint is malformed
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let (storage, policy) = build_storage(&config)?;

    let store = connect_store(&config, policy.clone()).await?;

    let reconciler_cancel = match (config.reconcile_interval(), &storage) {
        (Some(interval), Some(objects)) => {
            let cancel = spawn_reconciler(
                store.clone(),
                objects.clone(),
                ReconcilerConfig {
                    interval,
                    grace_window: Duration::from_secs(config.reconcile_grace_seconds),
                    pass_timeout: Duration::from_secs(config.reconcile_timeout_seconds),
                },
            );
            info!("Reconciler started (every {}s)", interval.as_secs());
            Some(cancel)
        }
        _ => None,
    };

    let state = AppState::new(&config, store, storage, policy);

    let app = app_router(state, config.behind_proxy);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(cancel) = reconciler_cancel {
        cancel.cancel();
    }
    info!("Shutdown complete");

    Ok(())
}

/// Builds the object storage client and the URL policy derived from its
/// endpoint, or `(None, None)` when no bucket is configured.
fn build_storage(config: &Config) -> Result<(Option<Arc<dyn ObjectClient>>, Option<ObjectUrlPolicy>)> {
    let Some(endpoint) = &config.s3_endpoint else {
        info!("Object storage disabled (uploads unavailable)");
        return Ok((None, None));
    };

    let endpoint_url = Url::parse(endpoint).context("S3_ENDPOINT is not a valid URL")?;

    let storage = ObjectStorage::s3(
        &endpoint_url,
        &config.s3_bucket,
        &config.s3_region,
        &config.s3_access_key,
        &config.s3_secret_key,
        config.s3_allow_http,
    )?;
    let policy = ObjectUrlPolicy::new(&endpoint_url, &config.s3_bucket);

    let storage: Arc<dyn ObjectClient> = Arc::new(storage);
    Ok((Some(storage), Some(policy)))
}

/// Connects the key store: Redis when configured, in-memory otherwise.
///
/// The Redis connect is retried with exponential backoff (500ms doubling,
/// capped at 5s, six attempts) so the service survives a store that comes
/// up a few seconds later, which is the common case under compose.
async fn connect_store(
    config: &Config,
    policy: Option<ObjectUrlPolicy>,
) -> Result<Arc<dyn KeyStore>> {
    let Some(redis_url) = &config.redis_url else {
        warn!("No Redis configured; tokens will not survive restarts");
        return Ok(Arc::new(MemoryKeyStore::new(config.default_ttl(), policy)));
    };

    let strategy = ExponentialBackoff::from_millis(2)
        .factor(250)
        .max_delay(Duration::from_secs(5))
        .take(5);

    let redis = Retry::spawn(strategy, || {
        RedisKeyStore::connect(redis_url, config.default_ttl(), policy.clone())
    })
    .await
    .context("Failed to connect to Redis")?;

    info!("Key store: Redis");
    Ok(Arc::new(redis))
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(err) => error!("failed to install Ctrl+C handler: {}", err),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => error!("failed to install SIGTERM handler: {}", err),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received SIGINT, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("received SIGTERM, initiating graceful shutdown");
        }
    }
}
