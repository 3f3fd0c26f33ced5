//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for the token store and the object bucket.
//!
//! # Modules
//!
//! - [`keystore`] - Key store backends (Redis and in-memory)
//! - [`storage`] - Object storage backends (S3-compatible and in-memory)

pub mod keystore;
pub mod storage;
