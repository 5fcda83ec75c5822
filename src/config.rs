//! Configuration types for engine construction.
//!
//! All dependencies are supplied at construction time through these structs;
//! there is no process-global state and no post-construction injection. The
//! active [`RestrictionMode`](crate::restriction::RestrictionMode) lives here
//! and is handed to the restriction authority when the engine is built.

use crate::restriction::RestrictionMode;
use serde::{Deserialize, Serialize};

/// Configuration for building a queue engine and its restriction authority
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiQueueConfig {
    pub storage: StorageConfig,
    pub restriction_mode: RestrictionMode,
}

impl Default for MultiQueueConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::InMemory(InMemoryConfig::default()),
            restriction_mode: RestrictionMode::None,
        }
    }
}

/// Backend-specific storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StorageConfig {
    InMemory(InMemoryConfig),
}

/// In-memory backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryConfig {
    /// Upper bound on the number of messages held per sub-queue
    pub max_sub_queue_size: usize,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_sub_queue_size: 10_000,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
