//! Storage backend adapter implementations.
//!
//! Each adapter satisfies the primitive contracts in
//! [`backend`](crate::backend) and [`restriction`](crate::restriction);
//! shared engine semantics live in [`engine`](crate::engine), not here.

pub mod memory;

pub use memory::{InMemoryBackend, InMemoryRestrictionStore};
