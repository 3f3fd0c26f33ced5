//! Key store backends for token mappings.
//!
//! Provides two implementations of [`crate::domain::repositories::KeyStore`]:
//! - [`RedisKeyStore`] - Production Redis-backed store
//! - [`MemoryKeyStore`] - In-process store for development and tests

use std::time::Duration;

mod memory_store;
mod redis_store;

pub use memory_store::MemoryKeyStore;
pub use redis_store::{CACHE_PREFIX, CRED_PREFIX, RedisKeyStore};

/// TTL for negative existence-cache entries.
///
/// "Not object-backed" rarely changes for a given target, so a short fixed
/// TTL is enough. Positive entries instead mirror their token's TTL.
pub(crate) const NEGATIVE_CACHE_TTL: Duration = Duration::from_secs(20 * 60);
