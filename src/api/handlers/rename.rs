//! Handler for token rename.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::json;
use validator::Validate;

use crate::api::dto::rename::{RenameParams, RenameResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Moves a mapping to a new token.
///
/// # Endpoint
///
/// `PATCH /v1/{old}/{new}`
///
/// # Behavior
///
/// The new token keeps the old one's remaining TTL and credential entry;
/// the old token is deleted. Renaming onto an existing token is refused.
///
/// # Errors
///
/// - 400 Bad Request if either token is malformed or both are the same
/// - 404 Not Found if the old token is unknown or expired
/// - 409 Conflict if the new token is already taken
pub async fn rename_handler(
    Path((old_token, new_token)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<RenameResponse>, AppError> {
    let params = RenameParams {
        old_token,
        new_token,
    };
    params.validate()?;

    if params.old_token == params.new_token {
        return Err(AppError::bad_request(
            "Old and new token must differ",
            json!({ "token": params.old_token }),
        ));
    }

    state
        .store
        .rename(&params.old_token, &params.new_token)
        .await?;

    Ok(Json(RenameResponse {
        short_url: state.short_url(&params.new_token),
        token: params.new_token,
    }))
}
