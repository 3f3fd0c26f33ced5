//! Handler for multipart file upload.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{Multipart, State},
};
use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};
use validator::Validate;

use crate::api::dto::upload::{UploadParams, UploadResponse};
use crate::domain::repositories::ObjectClient;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::slug::slugify_filename;

use super::shorten::create_with_generated_token;

/// Uploads a file and creates a token redirecting to it.
///
/// # Endpoint
///
/// `POST /v1/upload` (multipart/form-data)
///
/// # Fields
///
/// - `file` - the file to store (required; its filename becomes the
///   slugified object name)
/// - `token` - caller-chosen token (optional)
/// - `ttl_seconds` - lifetime of token and presigned target (optional,
///   default is the presign TTL)
///
/// # Request Flow
///
/// 1. Store the object, refusing to clobber an existing name
/// 2. Presign a GET URL under the service credential, expiring with the
///    token
/// 3. Write the token with the presigned URL as target
///
/// If the client disconnects mid-request or a later step fails, the
/// already stored object is deleted again, so no unreachable object waits
/// for the reconciler.
///
/// # Errors
///
/// - 400 Bad Request for a missing file or malformed fields
/// - 409 Conflict if the object name or token is already taken
/// - 503 Service Unavailable if object storage is not configured
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let storage = state.storage.clone().ok_or_else(|| {
        AppError::unavailable("Object storage is not configured", json!({}))
    })?;

    let (params, file) = parse_multipart(multipart).await?;
    params.validate()?;

    let file = file.ok_or_else(|| {
        AppError::bad_request("Multipart field 'file' is required", json!({}))
    })?;

    let object = slugify_filename(&file.name);
    let ttl_seconds = params.ttl_seconds.unwrap_or(state.presign_ttl.as_secs());
    let ttl = Duration::from_secs(ttl_seconds);
    let expires_at = Utc::now() + chrono::Duration::seconds(ttl_seconds as i64);

    storage.put(&object, file.data, Some(expires_at)).await?;
    debug!(object, size = file.size, "object stored");

    // From here on the object must not outlive a failed request.
    let mut guard = CleanupGuard::new(storage.clone(), object.clone());

    let target = storage.presign_get(&object, ttl, None).await?;

    let token = match params.token {
        Some(token) => {
            state.store.set(&token, &target, Some(ttl), true).await?;
            token
        }
        None => create_with_generated_token(&state, &target, Some(ttl), None).await?,
    };

    guard.disarm();

    Ok(Json(UploadResponse {
        short_url: state.short_url(&token),
        token,
        object,
        ttl_seconds,
    }))
}

/// One uploaded file with its original name.
struct FilePart {
    name: String,
    data: Bytes,
    size: usize,
}

/// Pulls the file and the plain fields out of the multipart body.
async fn parse_multipart(
    mut multipart: Multipart,
) -> Result<(UploadParams, Option<FilePart>), AppError> {
    let mut params = UploadParams::default();
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::bad_request("Malformed multipart body", json!({ "reason": e.to_string() }))
    })? {
        match field.name() {
            Some("file") => {
                let name = field.file_name().map(str::to_string).ok_or_else(|| {
                    AppError::bad_request("File field has no filename", json!({}))
                })?;
                let data = field.bytes().await.map_err(|e| {
                    AppError::bad_request(
                        "Failed to read file field",
                        json!({ "reason": e.to_string() }),
                    )
                })?;
                file = Some(FilePart {
                    name,
                    size: data.len(),
                    data,
                });
            }
            Some("token") => {
                params.token = Some(text_field(field, "token").await?);
            }
            Some("ttl_seconds") => {
                let raw = text_field(field, "ttl_seconds").await?;
                let ttl = raw.parse().map_err(|_| {
                    AppError::bad_request(
                        "Field 'ttl_seconds' must be a positive integer",
                        json!({ "value": raw }),
                    )
                })?;
                params.ttl_seconds = Some(ttl);
            }
            _ => {}
        }
    }

    Ok((params, file))
}

async fn text_field(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, AppError> {
    field.text().await.map_err(|e| {
        AppError::bad_request(
            format!("Failed to read field '{name}'"),
            json!({ "reason": e.to_string() }),
        )
    })
}

/// Deletes the stored object unless the request completed.
///
/// Axum drops the handler future when the client goes away, so cleanup
/// lives in `Drop` rather than an error branch.
struct CleanupGuard {
    storage: Arc<dyn ObjectClient>,
    object: Option<String>,
}

impl CleanupGuard {
    fn new(storage: Arc<dyn ObjectClient>, object: String) -> Self {
        Self {
            storage,
            object: Some(object),
        }
    }

    fn disarm(&mut self) {
        self.object = None;
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Some(object) = self.object.take() {
            let storage = self.storage.clone();
            tokio::spawn(async move {
                if let Err(e) = storage.delete(&object).await {
                    warn!(object, error = %e, "failed to clean up interrupted upload");
                }
            });
        }
    }
}
