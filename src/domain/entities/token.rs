//! Token entity representing a redirect-key mapping.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A live token with its target and derived object identity.
///
/// Produced by store enumeration. `object` is the object name the target
/// refers to in the configured bucket, or `None` when the target is an
/// ordinary external URL. `ttl_remaining` is `None` for entries without an
/// expiry, which normal writes never produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntry {
    pub token: String,
    pub target: String,
    pub object: Option<String>,
    pub ttl_remaining: Option<Duration>,
}

impl TokenEntry {
    /// Returns true if the target refers to an object in the bucket.
    pub fn is_object_backed(&self) -> bool {
        self.object.is_some()
    }
}

/// Per-token object-storage credentials, stored alongside the token.
///
/// Serialized as `{"access": ..., "secret": ...}` in the credential
/// namespace. The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCredential {
    pub access: String,
    pub secret: String,
}

impl ObjectCredential {
    /// Returns true if both parts are present.
    ///
    /// A credential with an empty access key or secret cannot sign
    /// requests, so writes reject it up front.
    pub fn is_complete(&self) -> bool {
        !self.access.is_empty() && !self.secret.is_empty()
    }
}

impl fmt::Debug for ObjectCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCredential")
            .field("access", &self.access)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One entry of the existence cache.
///
/// `object: None` is the negative entry: derivation ran and confirmed the
/// token's target is not object-backed. Negative entries exist so repeated
/// enumeration does not re-parse the same external URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub token: String,
    pub object: Option<String>,
}

impl CacheEntry {
    /// Returns true for confirmed-not-object-backed entries.
    pub fn is_negative(&self) -> bool {
        self.object.is_none()
    }
}
