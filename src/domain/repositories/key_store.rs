//! Key store trait and error types for token data access.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::{CacheEntry, ObjectCredential, TokenEntry};

/// Errors that can occur during key store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The token (or other addressed record) does not exist or has expired.
    #[error("Token not found")]
    NotFound,

    /// A conditional write found the token already taken.
    #[error("Token already exists")]
    AlreadyExists,

    /// Stored or supplied data is unusable, such as an incomplete credential.
    #[error("Malformed data: {0}")]
    Malformed(String),

    /// Network or engine failure; the operation may succeed if retried.
    #[error("Store I/O error: {0}")]
    Io(String),
}

/// Result type for key store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Interface over the token key-value store.
///
/// The store keeps three kinds of records in a flat namespace: plain token
/// keys mapping to target strings, `s3_exists:` entries caching each token's
/// derived object name, and `s3_cred:` entries holding per-token storage
/// credentials. All records carry the token's TTL; expiry is enforced by the
/// engine, so an expired token is indistinguishable from one never written.
///
/// Multi-key writes have no transaction support. Implementations use
/// compensating rollback: on a partial failure, whatever was already written
/// is deleted before the error is returned.
///
/// # Implementations
///
/// - [`crate::infrastructure::keystore::RedisKeyStore`] - Redis implementation
/// - [`crate::infrastructure::keystore::MemoryKeyStore`] - in-process fallback for
///   development and tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Writes a token-to-target mapping.
    ///
    /// `ttl` of `None` or zero applies the store's default. When the target
    /// derives to an object name, the existence-cache entry is written under
    /// the same TTL as a side effect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if `fail_if_exists` is set and
    /// the token is already taken; the existing mapping is left unmodified.
    /// Returns [`StoreError::Io`] on engine errors.
    async fn set(
        &self,
        token: &str,
        target: &str,
        ttl: Option<Duration>,
        fail_if_exists: bool,
    ) -> StoreResult<()>;

    /// Writes a token mapping plus its scoped storage credential.
    ///
    /// The credential lands in the `s3_cred:` namespace under the token's
    /// TTL. If the credential cannot be written, the token write (and its
    /// cache side effect) is rolled back, so no token exists without its
    /// required credential and no credential without its token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] for credentials missing the access
    /// key or secret; [`StoreError::AlreadyExists`] and [`StoreError::Io`]
    /// as for [`KeyStore::set`].
    async fn set_with_credential(
        &self,
        token: &str,
        target: &str,
        ttl: Option<Duration>,
        fail_if_exists: bool,
        credential: &ObjectCredential,
    ) -> StoreResult<()>;

    /// Looks up a token's target.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(target))` if the token is live
    /// - `Ok(None)` if it is unknown or expired
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on engine errors.
    async fn get(&self, token: &str) -> StoreResult<Option<String>>;

    /// Looks up a token's scoped credential.
    ///
    /// Absence is normal for tokens created without one. An unparseable
    /// stored credential is logged and reported as absent rather than
    /// failing the lookup.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on engine errors.
    async fn get_credential(&self, token: &str) -> StoreResult<Option<ObjectCredential>>;

    /// Enumerates all live tokens with target, derived object name, and
    /// remaining TTL.
    ///
    /// Internal namespace keys are skipped. For tokens without a cache hit,
    /// object identity is derived from the target once and the cache entry
    /// populated: under the token's remaining TTL when object-backed, under
    /// a short fixed TTL for the negative result. The scan is weakly
    /// consistent; tokens written or expired mid-scan may or may not appear.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the scan itself fails.
    async fn list(&self) -> StoreResult<Vec<TokenEntry>>;

    /// Removes a token, its cache entry, and its credential entry.
    ///
    /// Idempotent: absent sub-keys are not an error, and deleting an
    /// unknown token succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on engine errors.
    async fn delete(&self, token: &str) -> StoreResult<()>;

    /// Moves a mapping to a new token, deleting the old one.
    ///
    /// The remaining TTL carries over, as does the credential entry if one
    /// exists. The old token's cache and credential entries are removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `old_token` is not live and
    /// [`StoreError::AlreadyExists`] if `new_token` is already taken.
    /// Returns [`StoreError::Io`] on engine errors.
    async fn rename(&self, old_token: &str, new_token: &str) -> StoreResult<()>;

    /// Checks whether a token is currently live.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on engine errors.
    async fn exists(&self, token: &str) -> StoreResult<bool>;

    /// Builds the set of object names referenced by live tokens.
    ///
    /// Derives fresh from each token's target, never from the existence
    /// cache, because stale cache entries must not decide which objects are
    /// protected from deletion. Tokens that expire mid-scan are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the scan or any single target read
    /// fails. Callers treat this as "the set cannot be trusted."
    async fn live_object_references(&self) -> StoreResult<HashSet<String>>;

    /// Enumerates all existence-cache entries, including negative ones.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the scan itself fails.
    async fn cache_entries(&self) -> StoreResult<Vec<CacheEntry>>;

    /// Removes a single existence-cache entry. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on engine errors.
    async fn remove_cache_entry(&self, token: &str) -> StoreResult<()>;

    /// Removes every existence-cache entry pointing at the given object
    /// name, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the scan itself fails.
    async fn purge_cache_entries_for(&self, object: &str) -> StoreResult<u64>;

    /// Checks whether the store backend is reachable.
    ///
    /// Used by health check endpoints to report store status.
    async fn ping(&self) -> bool;
}
