//! API route configuration.
//!
//! All API endpoints require Bearer token authentication via
//! [`crate::api::middleware::auth`].

use crate::api::handlers::{
    delete_handler, list_handler, rename_handler, shorten_handler, upload_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
};

/// Request body cap for multipart uploads, in bytes.
///
/// Axum's default limit is 2 MB, which is too small for a file-sharing
/// endpoint. Objects larger than this are rejected with `413`.
const UPLOAD_BODY_LIMIT: usize = 100 * 1024 * 1024;

/// All API routes, protected by Bearer token authentication.
///
/// # Endpoints
///
/// - `POST   /shorten`       - Create a token for a target URL
/// - `GET    /list`          - Enumerate live tokens
/// - `POST   /upload`        - Upload a file and mint a token for it
/// - `DELETE /{token}`       - Delete a token
/// - `PATCH  /{old}/{new}`   - Rename a token
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/list", get(list_handler))
        .route(
            "/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/{token}", delete(delete_handler))
        .route("/{old_token}/{new_token}", patch(rename_handler))
}
