//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Store**: Tests key store PING
/// 2. **Storage**: Probes the object storage bucket, or reports `disabled`
///    when no bucket is configured
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "store": {
///       "status": "ok",
///       "message": "Key store connected"
///     },
///     "storage": {
///       "status": "ok",
///       "message": "Bucket reachable"
///     }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let store_check = check_store(&state).await;

    let storage_check = check_storage(&state).await;

    let all_healthy = store_check.status == "ok" && storage_check.status != "error";

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            store: store_check,
            storage: storage_check,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

/// Checks key store connectivity via PING command.
async fn check_store(state: &AppState) -> CheckStatus {
    if state.store.ping().await {
        CheckStatus {
            status: "ok".to_string(),
            message: Some("Key store connected".to_string()),
        }
    } else {
        CheckStatus {
            status: "error".to_string(),
            message: Some("Key store connection failed".to_string()),
        }
    }
}

/// Checks object storage reachability, if a bucket is configured.
async fn check_storage(state: &AppState) -> CheckStatus {
    let Some(storage) = &state.storage else {
        return CheckStatus {
            status: "disabled".to_string(),
            message: Some("Object storage not configured".to_string()),
        };
    };

    if storage.health_check().await {
        CheckStatus {
            status: "ok".to_string(),
            message: Some("Bucket reachable".to_string()),
        }
    } else {
        CheckStatus {
            status: "error".to_string(),
            message: Some("Bucket probe failed".to_string()),
        }
    }
}
