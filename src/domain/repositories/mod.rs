//! Repository trait definitions for the domain layer.
//!
//! This module defines the repository interfaces (traits) that abstract data
//! access operations. These traits are implemented by concrete stores in the
//! infrastructure layer.
//!
//! # Architecture
//!
//! - Traits define the contract for data operations
//! - Implementations live in `crate::infrastructure::keystore`
//! - Mock implementations are auto-generated via `mockall` for testing
//!
//! # Available Repositories
//!
//! - [`KeyStore`] - Token mappings, existence cache, and credentials
//! - [`ObjectClient`] - Bucket reads, conditional writes, and presigning

pub mod key_store;
pub mod object_client;

pub use key_store::{KeyStore, StoreError, StoreResult};
pub use object_client::{ObjectClient, ObjectInfo, StorageError, StorageResult};

#[cfg(test)]
pub use key_store::MockKeyStore;
#[cfg(test)]
pub use object_client::MockObjectClient;
