//! Core domain entities representing the business data model.
//!
//! This module contains the fundamental data structures that represent the
//! core concepts of the shortening service. Entities are plain data
//! structures without business logic.
//!
//! # Entity Types
//!
//! - [`TokenEntry`] - A live token with target and derived object identity
//! - [`ObjectCredential`] - Per-token object-storage credentials
//! - [`CacheEntry`] - One entry of the object-existence cache

pub mod token;

pub use token::{CacheEntry, ObjectCredential, TokenEntry};
