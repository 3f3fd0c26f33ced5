//! Redis-backed key store implementation.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, ExistenceCheck, SetExpiry, SetOptions};
use tracing::{debug, error, info, warn};

use crate::domain::entities::{CacheEntry, ObjectCredential, TokenEntry};
use crate::domain::repositories::key_store::{KeyStore, StoreError, StoreResult};
use crate::utils::object_name::ObjectUrlPolicy;

use super::NEGATIVE_CACHE_TTL;

/// Prefix of existence-cache keys.
pub const CACHE_PREFIX: &str = "s3_exists:";

/// Prefix of credential keys.
pub const CRED_PREFIX: &str = "s3_cred:";

/// Batch size hint passed to SCAN.
const SCAN_COUNT: usize = 200;

/// Redis key store implementation.
///
/// Uses connection pooling via `ConnectionManager` for efficient connection
/// reuse. Tokens, cache entries, and credentials share one logical database;
/// the `s3_exists:` / `s3_cred:` prefixes separate the namespaces.
pub struct RedisKeyStore {
    client: ConnectionManager,
    default_ttl: Duration,
    policy: Option<ObjectUrlPolicy>,
}

impl RedisKeyStore {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `default_ttl` - applied when `set` is called without a usable TTL
    /// - `policy` - object-identity derivation; `None` when object storage
    ///   is disabled, making every target "not object-backed"
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the URL is invalid, the connection
    /// cannot be established, or the PING health check fails.
    pub async fn connect(
        redis_url: &str,
        default_ttl: Duration,
        policy: Option<ObjectUrlPolicy>,
    ) -> StoreResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| StoreError::Io(format!("Failed to create Redis client: {}", e)))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Io(format!("Failed to connect to Redis: {}", e)))?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| StoreError::Io(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            default_ttl,
            policy,
        })
    }

    /// Resolves the TTL to apply to a write.
    ///
    /// `None` and sub-second values fall back to the default; TTLs are
    /// applied at whole-second resolution.
    fn effective_ttl(&self, ttl: Option<Duration>) -> Duration {
        match ttl {
            Some(t) if t.as_secs() >= 1 => t,
            _ => self.default_ttl,
        }
    }

    fn derive(&self, target: &str) -> Option<String> {
        self.policy.as_ref().and_then(|p| p.derive(target))
    }

    /// Writes the existence-cache entry for an object-backed target.
    ///
    /// Fail-open: a cache write failure is logged but never fails the
    /// owning token write, since `list` re-derives on a miss anyway.
    async fn write_cache_entry(&self, token: &str, target: &str, ttl: Duration) {
        let Some(object) = self.derive(target) else {
            return;
        };

        let key = cache_key(token);
        let mut conn = self.client.clone();
        if let Err(e) = conn.set_ex::<_, _, ()>(&key, &object, ttl.as_secs()).await {
            warn!("Redis SET error for cache entry {}: {}", key, e);
        }
    }

    /// Stores a credential under the token's TTL.
    async fn write_credential(
        &self,
        token: &str,
        credential: &ObjectCredential,
        ttl: Duration,
    ) -> StoreResult<()> {
        if !credential.is_complete() {
            return Err(StoreError::Malformed(
                "credential is missing its access key or secret".to_string(),
            ));
        }

        let payload = serde_json::to_string(credential)
            .map_err(|e| StoreError::Malformed(format!("credential encoding failed: {}", e)))?;

        let mut conn = self.client.clone();
        conn.set_ex::<_, _, ()>(cred_key(token), payload, ttl.as_secs())
            .await
            .map_err(io_err)?;
        Ok(())
    }

    /// Compensating rollback after a failed credential write.
    ///
    /// Removes the token and its fresh cache entry. Failures here leave a
    /// token without its credential until the TTL clears it, which is why
    /// they are logged at error level.
    async fn rollback_token(&self, token: &str) {
        let mut conn = self.client.clone();

        if let Err(e) = conn.del::<_, i64>(cache_key(token)).await {
            error!("Rollback failed to delete cache entry for {}: {}", token, e);
        }
        if let Err(e) = conn.del::<_, i64>(token).await {
            error!("Rollback failed to delete token {}: {}", token, e);
        }
    }

    /// Collects all keys matching a pattern via SCAN.
    ///
    /// Weakly consistent: keys written or expired mid-scan may or may not
    /// appear, and a concurrent rehash can surface a key twice.
    async fn scan_keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.client.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(io_err)?;

            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }

    /// Reads a token's remaining TTL.
    ///
    /// Returns `Ok(None)` for keys without expiry and `Err(NotFound)` for
    /// keys that are gone or within a second of expiring.
    async fn remaining_ttl(&self, token: &str) -> StoreResult<Option<Duration>> {
        let mut conn = self.client.clone();
        let ttl: i64 = conn.ttl(token).await.map_err(io_err)?;
        match ttl {
            -1 => Ok(None),
            s if s > 0 => Ok(Some(Duration::from_secs(s as u64))),
            _ => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl KeyStore for RedisKeyStore {
    async fn set(
        &self,
        token: &str,
        target: &str,
        ttl: Option<Duration>,
        fail_if_exists: bool,
    ) -> StoreResult<()> {
        let ttl = self.effective_ttl(ttl);
        let mut conn = self.client.clone();

        if fail_if_exists {
            let options = SetOptions::default()
                .conditional_set(ExistenceCheck::NX)
                .with_expiration(SetExpiry::EX(ttl.as_secs()));
            let written: Option<String> = conn
                .set_options(token, target, options)
                .await
                .map_err(io_err)?;
            if written.is_none() {
                return Err(StoreError::AlreadyExists);
            }
        } else {
            conn.set_ex::<_, _, ()>(token, target, ttl.as_secs())
                .await
                .map_err(io_err)?;
        }

        debug!("Store SET: {} (TTL: {}s)", token, ttl.as_secs());
        self.write_cache_entry(token, target, ttl).await;
        Ok(())
    }

    async fn set_with_credential(
        &self,
        token: &str,
        target: &str,
        ttl: Option<Duration>,
        fail_if_exists: bool,
        credential: &ObjectCredential,
    ) -> StoreResult<()> {
        let ttl = self.effective_ttl(ttl);
        self.set(token, target, Some(ttl), fail_if_exists).await?;

        if let Err(err) = self.write_credential(token, credential, ttl).await {
            warn!(
                "Credential write for {} failed, rolling back token: {}",
                token, err
            );
            self.rollback_token(token).await;
            return Err(err);
        }

        Ok(())
    }

    async fn get(&self, token: &str) -> StoreResult<Option<String>> {
        let mut conn = self.client.clone();
        let target: Option<String> = conn.get(token).await.map_err(io_err)?;
        Ok(target)
    }

    async fn get_credential(&self, token: &str) -> StoreResult<Option<ObjectCredential>> {
        let mut conn = self.client.clone();
        let raw: Option<String> = conn.get(cred_key(token)).await.map_err(io_err)?;

        match raw {
            None => Ok(None),
            Some(json) => match serde_json::from_str::<ObjectCredential>(&json) {
                Ok(credential) => Ok(Some(credential)),
                Err(e) => {
                    warn!("Unparseable credential entry for {}: {}", token, e);
                    Ok(None)
                }
            },
        }
    }

    async fn list(&self) -> StoreResult<Vec<TokenEntry>> {
        let keys = self.scan_keys("*").await?;
        let mut entries = Vec::with_capacity(keys.len());
        let mut conn = self.client.clone();

        for token in keys {
            if token.starts_with(CACHE_PREFIX) || token.starts_with(CRED_PREFIX) {
                continue;
            }

            // Tokens can expire between the scan and these reads; skip them.
            let target: Option<String> = match conn.get(&token).await {
                Ok(value) => value,
                Err(e) => {
                    warn!("Skipping {} in listing, read failed: {}", token, e);
                    continue;
                }
            };
            let Some(target) = target else {
                continue;
            };

            let ttl_remaining = match self.remaining_ttl(&token).await {
                Ok(ttl) => ttl,
                Err(StoreError::NotFound) => continue,
                Err(e) => {
                    warn!("Skipping {} in listing, TTL read failed: {}", token, e);
                    continue;
                }
            };

            let cached: Result<Option<String>, _> = conn.get(cache_key(&token)).await;
            let object = match cached {
                Ok(Some(name)) => {
                    if name.is_empty() {
                        None
                    } else {
                        Some(name)
                    }
                }
                Ok(None) => {
                    // Cache miss: derive once and populate. Object-backed
                    // entries mirror the token's TTL so they cannot lapse
                    // before the token does; negative entries take the
                    // short fixed TTL.
                    let derived = self.derive(&target);
                    let value = derived.clone().unwrap_or_default();
                    let fill = match (&derived, ttl_remaining) {
                        (Some(_), Some(ttl)) => Some(ttl),
                        (Some(_), None) => None,
                        (None, _) => Some(NEGATIVE_CACHE_TTL),
                    };
                    let write = match fill {
                        Some(ttl) => {
                            conn.set_ex::<_, _, ()>(cache_key(&token), &value, ttl.as_secs())
                                .await
                        }
                        None => conn.set::<_, _, ()>(cache_key(&token), &value).await,
                    };
                    if let Err(e) = write {
                        warn!("Cache fill failed for {}: {}", token, e);
                    }
                    derived
                }
                Err(e) => {
                    warn!("Cache read failed for {}, deriving directly: {}", token, e);
                    self.derive(&target)
                }
            };

            entries.push(TokenEntry {
                token,
                target,
                object,
                ttl_remaining,
            });
        }

        Ok(entries)
    }

    async fn delete(&self, token: &str) -> StoreResult<()> {
        let mut conn = self.client.clone();

        if let Err(e) = conn.del::<_, i64>(cache_key(token)).await {
            warn!("Failed to delete cache entry for {}: {}", token, e);
        }
        if let Err(e) = conn.del::<_, i64>(cred_key(token)).await {
            warn!("Failed to delete credential entry for {}: {}", token, e);
        }

        conn.del::<_, i64>(token).await.map_err(io_err)?;
        debug!("Store DEL: {}", token);
        Ok(())
    }

    async fn rename(&self, old_token: &str, new_token: &str) -> StoreResult<()> {
        let target = self.get(old_token).await?.ok_or(StoreError::NotFound)?;
        let ttl = self.remaining_ttl(old_token).await?;
        let credential = self.get_credential(old_token).await?;

        match credential {
            Some(cred) => {
                self.set_with_credential(new_token, &target, ttl, true, &cred)
                    .await?
            }
            None => self.set(new_token, &target, ttl, true).await?,
        }

        // If this delete fails both tokens stay live until the old TTL
        // runs out; the error still surfaces to the caller.
        self.delete(old_token).await?;
        debug!("Store RENAME: {} -> {}", old_token, new_token);
        Ok(())
    }

    async fn exists(&self, token: &str) -> StoreResult<bool> {
        let mut conn = self.client.clone();
        let exists: bool = conn.exists(token).await.map_err(io_err)?;
        Ok(exists)
    }

    async fn live_object_references(&self) -> StoreResult<HashSet<String>> {
        let keys = self.scan_keys("*").await?;
        let mut references = HashSet::new();
        let mut conn = self.client.clone();

        for token in keys {
            if token.starts_with(CACHE_PREFIX) || token.starts_with(CRED_PREFIX) {
                continue;
            }

            // A failed read means the set could be missing a live
            // reference, so it propagates instead of being skipped.
            let target: Option<String> = conn.get(&token).await.map_err(io_err)?;
            let Some(target) = target else {
                continue;
            };

            if let Some(object) = self.derive(&target) {
                references.insert(object);
            }
        }

        Ok(references)
    }

    async fn cache_entries(&self) -> StoreResult<Vec<CacheEntry>> {
        let keys = self.scan_keys(&format!("{}*", CACHE_PREFIX)).await?;
        let mut entries = Vec::with_capacity(keys.len());
        let mut conn = self.client.clone();

        for key in keys {
            let Some(token) = key.strip_prefix(CACHE_PREFIX) else {
                continue;
            };

            let value: Option<String> = match conn.get(&key).await {
                Ok(value) => value,
                Err(e) => {
                    warn!("Skipping cache entry {}, read failed: {}", key, e);
                    continue;
                }
            };
            let Some(value) = value else {
                continue;
            };

            entries.push(CacheEntry {
                token: token.to_string(),
                object: if value.is_empty() { None } else { Some(value) },
            });
        }

        Ok(entries)
    }

    async fn remove_cache_entry(&self, token: &str) -> StoreResult<()> {
        let mut conn = self.client.clone();
        conn.del::<_, i64>(cache_key(token)).await.map_err(io_err)?;
        Ok(())
    }

    async fn purge_cache_entries_for(&self, object: &str) -> StoreResult<u64> {
        let keys = self.scan_keys(&format!("{}*", CACHE_PREFIX)).await?;
        let mut removed = 0u64;
        let mut conn = self.client.clone();

        for key in keys {
            let value: Option<String> = match conn.get(&key).await {
                Ok(value) => value,
                Err(e) => {
                    warn!("Skipping cache entry {}, read failed: {}", key, e);
                    continue;
                }
            };

            if value.as_deref() == Some(object) {
                match conn.del::<_, i64>(&key).await {
                    Ok(n) => removed += n as u64,
                    Err(e) => warn!("Failed to purge cache entry {}: {}", key, e),
                }
            }
        }

        Ok(removed)
    }

    async fn ping(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}

fn cache_key(token: &str) -> String {
    format!("{}{}", CACHE_PREFIX, token)
}

fn cred_key(token: &str) -> String {
    format!("{}{}", CRED_PREFIX, token)
}

fn io_err(e: redis::RedisError) -> StoreError {
    StoreError::Io(e.to_string())
}
