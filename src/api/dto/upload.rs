//! DTOs for the multipart upload endpoint.

use serde::Serialize;
use validator::Validate;

use super::shorten::TOKEN_REGEX;

/// Non-file fields of the multipart request, validated after parsing.
///
/// The TTL cap matches the SigV4 presigning limit: the stored target is a
/// presigned URL whose expiry equals the token TTL, so a longer-lived
/// token would outlive the URL it serves.
#[derive(Debug, Default, Validate)]
pub struct UploadParams {
    #[validate(length(min = 1, max = 64))]
    #[validate(regex(path = *TOKEN_REGEX))]
    pub token: Option<String>,

    #[validate(range(min = 1, max = 604_800))]
    pub ttl_seconds: Option<u64>,
}

/// Response for a completed upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub token: String,
    pub short_url: String,
    /// Object name the file was stored under.
    pub object: String,
    /// Lifetime of both the token and its presigned target, in seconds.
    pub ttl_seconds: u64,
}
