//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::Redirect,
};
use serde_json::json;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a token to its target.
///
/// # Endpoint
///
/// `GET /{token}`
///
/// # Request Flow
///
/// 1. Look up the token's target
/// 2. For object-backed targets with a stored credential, presign a fresh
///    GET URL under that credential and redirect there
/// 3. Otherwise redirect to the stored target as-is
///
/// Presigning is best-effort: any failure along that path logs and falls
/// back to the stored target, so a storage outage degrades redirects
/// instead of breaking them.
///
/// # Status
///
/// Responds `307 Temporary Redirect`. Targets are TTL-bounded, so a
/// permanent redirect would let clients cache a link that is about to die.
///
/// # Errors
///
/// Returns 404 Not Found if the token is unknown or expired.
pub async fn redirect_handler(
    Path(token): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    let target = state
        .store
        .get(&token)
        .await?
        .ok_or_else(|| AppError::not_found("Token not found", json!({ "token": token })))?;

    metrics::counter!("redirects_total").increment(1);

    if let Some(url) = presigned_target(&state, &token, &target).await {
        return Ok(Redirect::temporary(&url));
    }

    Ok(Redirect::temporary(&target))
}

/// Presigns the target's object under the token's stored credential.
///
/// Returns `None` when the token has no credential, the target does not
/// point into the configured bucket, or presigning fails.
async fn presigned_target(state: &AppState, token: &str, target: &str) -> Option<String> {
    let storage = state.storage.as_ref()?;
    let object = state.policy.as_ref()?.derive(target)?;

    let credential = match state.store.get_credential(token).await {
        Ok(credential) => credential?,
        Err(e) => {
            warn!(token, error = %e, "credential lookup failed, redirecting to stored target");
            return None;
        }
    };

    match storage
        .presign_get(&object, state.presign_ttl, Some(credential))
        .await
    {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(token, object, error = %e, "presign failed, redirecting to stored target");
            None
        }
    }
}
