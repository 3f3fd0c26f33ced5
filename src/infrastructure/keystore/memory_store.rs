//! In-process key store for development and tests.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::NEGATIVE_CACHE_TTL;
use crate::domain::entities::{CacheEntry, ObjectCredential, TokenEntry};
use crate::domain::repositories::key_store::{KeyStore, StoreError, StoreResult};
use crate::utils::object_name::ObjectUrlPolicy;

/// One stored value with its expiry deadline.
///
/// Cache records hold the object name, with the empty string as the
/// negative marker, mirroring the engine wire format. Credential records
/// hold the serialized JSON.
struct Record {
    value: String,
    expires_at: Option<Instant>,
}

impl Record {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }

    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[derive(Default)]
struct Inner {
    tokens: HashMap<String, Record>,
    cache: HashMap<String, Record>,
    credentials: HashMap<String, Record>,
}

impl Inner {
    /// Looks up a record, treating expired ones as absent.
    ///
    /// Expired records are never returned, only overwritten or removed in
    /// passing, so an expired token is indistinguishable from one never
    /// written.
    fn live<'a>(map: &'a HashMap<String, Record>, key: &str, now: Instant) -> Option<&'a Record> {
        map.get(key).filter(|record| !record.is_expired(now))
    }
}

/// Key store held entirely in process memory.
///
/// Used when no Redis connection is configured and by the integration
/// tests. Behaves like the Redis store, with one relaxation: TTLs are
/// honored at full `Instant` precision instead of the engine's
/// whole-second writes, which keeps expiry tests fast.
pub struct MemoryKeyStore {
    inner: RwLock<Inner>,
    default_ttl: Duration,
    policy: Option<ObjectUrlPolicy>,
}

impl MemoryKeyStore {
    /// Creates an empty store.
    pub fn new(default_ttl: Duration, policy: Option<ObjectUrlPolicy>) -> Self {
        debug!("Using MemoryKeyStore (no Redis configured)");
        Self {
            inner: RwLock::new(Inner::default()),
            default_ttl,
            policy,
        }
    }

    fn effective_ttl(&self, ttl: Option<Duration>) -> Duration {
        match ttl {
            Some(t) if !t.is_zero() => t,
            _ => self.default_ttl,
        }
    }

    fn derive(&self, target: &str) -> Option<String> {
        self.policy.as_ref().and_then(|p| p.derive(target))
    }

    /// Writes the token and, for object-backed targets, its cache entry.
    fn insert_token(inner: &mut Inner, token: &str, target: &str, object: Option<String>, deadline: Instant) {
        inner.tokens.insert(
            token.to_string(),
            Record {
                value: target.to_string(),
                expires_at: Some(deadline),
            },
        );
        if let Some(object) = object {
            inner.cache.insert(
                token.to_string(),
                Record {
                    value: object,
                    expires_at: Some(deadline),
                },
            );
        }
    }

    fn rollback(inner: &mut Inner, token: &str) {
        inner.tokens.remove(token);
        inner.cache.remove(token);
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn set(
        &self,
        token: &str,
        target: &str,
        ttl: Option<Duration>,
        fail_if_exists: bool,
    ) -> StoreResult<()> {
        let ttl = self.effective_ttl(ttl);
        let now = Instant::now();
        let mut inner = self.inner.write().await;

        if fail_if_exists && Inner::live(&inner.tokens, token, now).is_some() {
            return Err(StoreError::AlreadyExists);
        }

        Self::insert_token(&mut inner, token, target, self.derive(target), now + ttl);
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
        let now = Instant::now();
        let mut inner = self.inner.write().await;

        if fail_if_exists && Inner::live(&inner.tokens, token, now).is_some() {
            return Err(StoreError::AlreadyExists);
        }

        Self::insert_token(&mut inner, token, target, self.derive(target), now + ttl);

        // Credential step, rolled back on failure like the engine-backed
        // store.
        if !credential.is_complete() {
            Self::rollback(&mut inner, token);
            return Err(StoreError::Malformed(
                "credential is missing its access key or secret".to_string(),
            ));
        }
        let payload = match serde_json::to_string(credential) {
            Ok(json) => json,
            Err(e) => {
                Self::rollback(&mut inner, token);
                return Err(StoreError::Malformed(format!(
                    "credential encoding failed: {}",
                    e
                )));
            }
        };
        inner.credentials.insert(
            token.to_string(),
            Record {
                value: payload,
                expires_at: Some(now + ttl),
            },
        );

        Ok(())
    }

    async fn get(&self, token: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        let inner = self.inner.read().await;
        Ok(Inner::live(&inner.tokens, token, now).map(|record| record.value.clone()))
    }

    async fn get_credential(&self, token: &str) -> StoreResult<Option<ObjectCredential>> {
        let now = Instant::now();
        let inner = self.inner.read().await;

        match Inner::live(&inner.credentials, token, now) {
            None => Ok(None),
            Some(record) => match serde_json::from_str::<ObjectCredential>(&record.value) {
                Ok(credential) => Ok(Some(credential)),
                Err(e) => {
                    warn!("Unparseable credential entry for {}: {}", token, e);
                    Ok(None)
                }
            },
        }
    }

    async fn list(&self) -> StoreResult<Vec<TokenEntry>> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        let mut entries = Vec::with_capacity(inner.tokens.len());
        let mut fills: Vec<(String, String, Option<Duration>)> = Vec::new();

        for (token, record) in &inner.tokens {
            if record.is_expired(now) {
                continue;
            }
            let target = record.value.clone();
            let ttl_remaining = record.remaining(now);

            let object = match Inner::live(&inner.cache, token, now) {
                Some(cached) => {
                    if cached.value.is_empty() {
                        None
                    } else {
                        Some(cached.value.clone())
                    }
                }
                None => {
                    let derived = self.derive(&target);
                    let fill_ttl = match (&derived, ttl_remaining) {
                        (Some(_), remaining) => remaining,
                        (None, _) => Some(NEGATIVE_CACHE_TTL),
                    };
                    fills.push((
                        token.clone(),
                        derived.clone().unwrap_or_default(),
                        fill_ttl,
                    ));
                    derived
                }
            };

            entries.push(TokenEntry {
                token: token.clone(),
                target,
                object,
                ttl_remaining,
            });
        }

        for (token, value, ttl) in fills {
            inner.cache.insert(
                token,
                Record {
                    value,
                    expires_at: ttl.map(|t| now + t),
                },
            );
        }

        Ok(entries)
    }

    async fn delete(&self, token: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.cache.remove(token);
        inner.credentials.remove(token);
        inner.tokens.remove(token);
        Ok(())
    }

    async fn rename(&self, old_token: &str, new_token: &str) -> StoreResult<()> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;

        let (target, remaining) = match Inner::live(&inner.tokens, old_token, now) {
            Some(record) => (record.value.clone(), record.remaining(now)),
            None => return Err(StoreError::NotFound),
        };
        if Inner::live(&inner.tokens, new_token, now).is_some() {
            return Err(StoreError::AlreadyExists);
        }

        let deadline = now + remaining.unwrap_or(self.default_ttl);
        let credential = Inner::live(&inner.credentials, old_token, now)
            .map(|record| record.value.clone());

        Self::insert_token(&mut inner, new_token, &target, self.derive(&target), deadline);
        if let Some(payload) = credential {
            inner.credentials.insert(
                new_token.to_string(),
                Record {
                    value: payload,
                    expires_at: Some(deadline),
                },
            );
        }

        inner.tokens.remove(old_token);
        inner.cache.remove(old_token);
        inner.credentials.remove(old_token);
        Ok(())
    }

    async fn exists(&self, token: &str) -> StoreResult<bool> {
        let now = Instant::now();
        let inner = self.inner.read().await;
        Ok(Inner::live(&inner.tokens, token, now).is_some())
    }

    async fn live_object_references(&self) -> StoreResult<HashSet<String>> {
        let now = Instant::now();
        let inner = self.inner.read().await;
        let mut references = HashSet::new();

        for record in inner.tokens.values() {
            if record.is_expired(now) {
                continue;
            }
            if let Some(object) = self.derive(&record.value) {
                references.insert(object);
            }
        }

        Ok(references)
    }

    async fn cache_entries(&self) -> StoreResult<Vec<CacheEntry>> {
        let now = Instant::now();
        let inner = self.inner.read().await;
        let mut entries = Vec::with_capacity(inner.cache.len());

        for (token, record) in &inner.cache {
            if record.is_expired(now) {
                continue;
            }
            entries.push(CacheEntry {
                token: token.clone(),
                object: if record.value.is_empty() {
                    None
                } else {
                    Some(record.value.clone())
                },
            });
        }

        Ok(entries)
    }

    async fn remove_cache_entry(&self, token: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.cache.remove(token);
        Ok(())
    }

    async fn purge_cache_entries_for(&self, object: &str) -> StoreResult<u64> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        let before = inner.cache.len();

        inner
            .cache
            .retain(|_, record| record.is_expired(now) || record.value != object);

        Ok((before - inner.cache.len()) as u64)
    }

    async fn ping(&self) -> bool {
        true
    }
}
