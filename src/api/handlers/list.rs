//! Handler for token listing.

use axum::{Json, extract::State};

use crate::api::dto::list::TokenEntryDto;
use crate::error::AppError;
use crate::state::AppState;

/// Lists all live tokens.
///
/// # Endpoint
///
/// `GET /v1/list`
///
/// # Behavior
///
/// The listing is a weakly consistent snapshot: tokens created or expiring
/// while the scan runs may or may not appear. An empty store yields an
/// empty array, not an error.
///
/// # Errors
///
/// Returns 503 Service Unavailable if the store cannot be scanned.
pub async fn list_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<TokenEntryDto>>, AppError> {
    let entries = state.store.list().await?;

    Ok(Json(entries.into_iter().map(TokenEntryDto::from).collect()))
}
