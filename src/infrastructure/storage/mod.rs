//! Object storage backends.
//!
//! Implements [`crate::domain::repositories::ObjectClient`] over any
//! S3-compatible endpoint, with in-memory variants for development and
//! tests.

mod object_storage;

pub use object_storage::ObjectStorage;
