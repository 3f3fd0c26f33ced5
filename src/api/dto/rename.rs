//! DTOs for the token rename endpoint.

use serde::Serialize;
use validator::Validate;

use super::shorten::TOKEN_REGEX;

/// Path parameters of `PATCH /v1/{old}/{new}`, validated before the store
/// is touched.
#[derive(Debug, Validate)]
pub struct RenameParams {
    #[validate(length(min = 1, max = 64))]
    #[validate(regex(path = *TOKEN_REGEX))]
    pub old_token: String,

    #[validate(length(min = 1, max = 64))]
    #[validate(regex(path = *TOKEN_REGEX))]
    pub new_token: String,
}

/// Response for a completed rename.
#[derive(Debug, Serialize)]
pub struct RenameResponse {
    pub token: String,
    pub short_url: String,
}
