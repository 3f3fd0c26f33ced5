//! Utility functions for token generation and URL processing.
//!
//! This module provides helper functions used across the application:
//!
//! - [`token`] - Pronounceable random token generation
//! - [`object_name`] - Object-identity derivation from target URLs
//! - [`slug`] - Upload filename slugification

pub mod object_name;
pub mod slug;
pub mod token;
