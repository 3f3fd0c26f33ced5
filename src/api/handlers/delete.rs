//! Handler for token deletion.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

/// Deletes a token together with its cache and credential entries.
///
/// # Endpoint
///
/// `DELETE /v1/{token}`
///
/// # Behavior
///
/// The mapping is removed immediately; the object a deleted token pointed
/// at is reaped later by the reconciler once nothing else references it.
///
/// # Errors
///
/// Returns 404 Not Found if the token is unknown or expired.
pub async fn delete_handler(
    Path(token): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if !state.store.exists(&token).await? {
        return Err(AppError::not_found(
            "Token not found",
            json!({ "token": token }),
        ));
    }

    state.store.delete(&token).await?;

    Ok(StatusCode::NO_CONTENT)
}
