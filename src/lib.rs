//! # Shortlink
//!
//! A URL shortener with S3-backed file links and automatic reconciliation
//! of the bucket against live tokens, built with Axum and Redis.
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture principles with clear layer separation:
//!
//! - **Domain Layer** ([`domain`]) - Core entities, repository traits, and the
//!   reconciliation worker
//! - **Infrastructure Layer** ([`infrastructure`]) - Redis key store and
//!   S3-compatible object storage
//! - **API Layer** ([`api`]) - REST API handlers, DTOs, and middleware
//!
//! ## Features
//!
//! - Expiring short tokens for arbitrary URLs, with custom names and TTLs
//! - Multipart file uploads that mint a token for a presigned object URL
//! - Background reconciler that deletes bucket objects no live token
//!   references
//! - API key authentication, rate limiting, and observability
//!
//! ## Quick Start
//!
//! ```bash
//! # Set required environment variables
//! export API_KEY="change-me"
//! export REDIS_URL="redis://localhost:6379"   # Optional, in-memory otherwise
//! export S3_ENDPOINT="http://localhost:9000"  # Optional, enables uploads
//! export S3_BUCKET="shortlink"
//! export S3_ACCESS_KEY="minioadmin"
//! export S3_SECRET_KEY="minioadmin"
//! export S3_ALLOW_HTTP="true"
//!
//! # Start the service
//! cargo run
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via [`config::Config`].
//! See [`config`] module for available options.

pub mod api;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod utils;

pub mod config;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::domain::entities::{ObjectCredential, TokenEntry};
    pub use crate::domain::reconciler::{PassSummary, Reconciler, ReconcilerConfig};
    pub use crate::domain::repositories::{KeyStore, ObjectClient};
    pub use crate::error::AppError;
    pub use crate::state::AppState;
}
