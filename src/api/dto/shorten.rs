//! DTOs for the token creation endpoint.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

use crate::domain::entities::ObjectCredential;

/// Compiled regex for caller-chosen tokens. Tokens appear verbatim in
/// public URL paths, so only unreserved characters are allowed.
pub(crate) static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Request to create a token for a target URL.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The target URL (must be valid HTTP/HTTPS).
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,

    /// Optional caller-chosen token (otherwise a random one is generated).
    #[validate(length(min = 1, max = 64))]
    #[validate(regex(path = *TOKEN_REGEX, message = "Token may only contain letters, digits, '-' and '_'"))]
    pub token: Option<String>,

    /// Optional lifetime in seconds (otherwise the service default applies).
    #[validate(range(min = 1, max = 31_536_000))]
    pub ttl_seconds: Option<u64>,

    /// Optional storage credential scoped to this token. When present,
    /// redirects answer with a URL freshly presigned under it.
    #[validate(nested)]
    pub credential: Option<CredentialDto>,
}

/// Storage credential supplied alongside a token.
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialDto {
    #[validate(length(min = 1))]
    pub access: String,

    #[validate(length(min = 1))]
    pub secret: String,
}

impl From<CredentialDto> for ObjectCredential {
    fn from(dto: CredentialDto) -> Self {
        ObjectCredential {
            access: dto.access,
            secret: dto.secret,
        }
    }
}

/// Response for a created token.
#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub token: String,
    pub short_url: String,
    /// Effective lifetime of the mapping in seconds.
    pub ttl_seconds: u64,
}
