//! # Multiqueue Runtime
//!
//! Multi-tenant sub-queue runtime: callers enqueue and dequeue payloads under
//! independent named sub-queues, with pluggable storage backends sharing one
//! contract and an optional restriction layer gating which sub-queues require
//! a possession token to manipulate.
//!
//! This library provides:
//! - Backend-agnostic queue engine semantics (duplicate detection, ordering,
//!   assignment tracking, index generation) implemented once over a small
//!   primitive-operation contract
//! - A restriction authority deciding, from the active mode and a membership
//!   set, whether a caller may act on a sub-queue
//! - Reserved-identifier protection so authorization bookkeeping can never be
//!   read or corrupted through the ordinary queue API
//! - A fully functional in-memory backend for testing, development, and
//!   single-process deployments
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all engine and restriction operations
//! - [`message`] - Message record and validated domain identifiers
//! - [`config`] - Construction-time configuration
//! - [`backend`] - Storage backend primitive contract
//! - [`engine`] - Shared engine semantics and the factory
//! - [`restriction`] - Restriction mode, membership store, and authority
//! - [`backends`] - Storage adapter implementations

// Module declarations
pub mod backend;
pub mod backends;
pub mod config;
pub mod engine;
pub mod error;
pub mod message;
pub mod restriction;

// Re-export commonly used types at crate root for convenience
pub use backend::{StorageBackend, StorageType, SubQueueIndex};
pub use backends::memory::{InMemoryBackend, InMemoryRestrictionStore};
pub use config::{InMemoryConfig, MultiQueueConfig, StorageConfig};
pub use engine::{MultiQueue, MultiQueueFactory};
pub use error::{MultiQueueError, ValidationError};
pub use message::{MessageUuid, QueueMessage, SubQueueName, Timestamp};
pub use restriction::{RestrictionAuthority, RestrictionMode, RestrictionStore};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
