//! Handler for the token creation endpoint.

use std::time::Duration;

use axum::{Json, extract::State};
use serde_json::json;
use tracing::debug;
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::domain::entities::ObjectCredential;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::token::generate_token;

/// Generated tokens can collide with existing ones; retry a few times
/// before reporting a conflict.
const GENERATED_TOKEN_ATTEMPTS: u32 = 3;

/// Creates a token mapping to a target URL.
///
/// # Endpoint
///
/// `POST /v1/shorten`
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://example.com/page",
///   "token": "my-link",           // optional
///   "ttl_seconds": 3600,          // optional
///   "credential": {               // optional
///     "access": "AKIA...",
///     "secret": "..."
///   }
/// }
/// ```
///
/// # Errors
///
/// - 400 Bad Request if validation fails
/// - 409 Conflict if the requested token is already taken
/// - 503 Service Unavailable if the store cannot be reached
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>, AppError> {
    payload.validate()?;

    let ttl = payload.ttl_seconds.map(Duration::from_secs);
    let ttl_seconds = payload.ttl_seconds.unwrap_or(state.default_ttl.as_secs());
    let credential = payload.credential.map(ObjectCredential::from);

    let token = match payload.token {
        Some(token) => {
            write_mapping(&state, &token, &payload.url, ttl, credential.as_ref()).await?;
            token
        }
        None => {
            create_with_generated_token(&state, &payload.url, ttl, credential.as_ref()).await?
        }
    };

    Ok(Json(ShortenResponse {
        short_url: state.short_url(&token),
        token,
        ttl_seconds,
    }))
}

/// Writes the token, taking the credential path when one was supplied.
async fn write_mapping(
    state: &AppState,
    token: &str,
    url: &str,
    ttl: Option<Duration>,
    credential: Option<&ObjectCredential>,
) -> Result<(), AppError> {
    match credential {
        Some(credential) => {
            state
                .store
                .set_with_credential(token, url, ttl, true, credential)
                .await?
        }
        None => state.store.set(token, url, ttl, true).await?,
    }
    Ok(())
}

pub(super) async fn create_with_generated_token(
    state: &AppState,
    url: &str,
    ttl: Option<Duration>,
    credential: Option<&ObjectCredential>,
) -> Result<String, AppError> {
    for _ in 0..GENERATED_TOKEN_ATTEMPTS {
        let token = generate_token();
        match write_mapping(state, &token, url, ttl, credential).await {
            Ok(()) => return Ok(token),
            Err(AppError::Conflict { .. }) => {
                debug!(token, "generated token already taken, retrying");
            }
            Err(e) => return Err(e),
        }
    }

    Err(AppError::conflict(
        "Could not find a free token",
        json!({ "attempts": GENERATED_TOKEN_ATTEMPTS }),
    ))
}
