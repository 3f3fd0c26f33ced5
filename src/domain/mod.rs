//! Domain layer containing business entities and logic.
//!
//! This module implements the core domain logic following Clean Architecture
//! principles. It defines entities, repository interfaces, and the
//! reconciliation worker independent of infrastructure concerns.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`reconciler`] - Background reconciliation of bucket contents against
//!   live tokens
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository traits define contracts implemented by infrastructure layer
//!
//! # Reconciliation Flow
//!
//! 1. [`reconciler::spawn_reconciler`] starts a single timer-driven task
//! 2. Each tick runs one pass: the live-reference scan feeds the dead-token
//!    cache sweep and the orphaned-object bucket sweep
//! 3. Object deletions go through the object client; cache invalidation goes
//!    through [`repositories::KeyStore`]

pub mod entities;
pub mod reconciler;
pub mod repositories;
