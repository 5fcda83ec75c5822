//! Storage backend contract.
//!
//! Each storage adapter implements a small set of primitive operations; the
//! shared engine semantics (duplicate detection, ordering, assignment
//! queries, reserved-identifier protection) are implemented once in
//! [`MultiQueue`](crate::engine::MultiQueue) on top of these primitives.

use crate::error::MultiQueueError;
use crate::message::{MessageUuid, QueueMessage, SubQueueName};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Enumeration of supported storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageType {
    InMemory,
}

impl StorageType {
    /// Check whether the backend assigns message indexes itself.
    ///
    /// When true, [`StorageBackend::next_sub_queue_index`] reports
    /// [`SubQueueIndex::BackendAssigned`] and the engine leaves the index
    /// unset until the store call.
    pub fn assigns_own_indexes(&self) -> bool {
        match self {
            Self::InMemory => false,
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InMemory => write!(f, "InMemory"),
        }
    }
}

/// Outcome of computing the next ordering index for a sub-queue.
///
/// The two cases are deliberately distinct rather than overloading a single
/// sentinel: `Next` means "assign this ordinal before insertion", while
/// `BackendAssigned` means the underlying store numbers messages itself and
/// the caller must assign nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubQueueIndex {
    /// The ordinal to assign to the next inserted message
    Next(u64),
    /// The underlying store assigns indexes itself
    BackendAssigned,
}

impl SubQueueIndex {
    /// Get the ordinal to assign, if the backend expects the caller to assign one
    pub fn next_index(&self) -> Option<u64> {
        match self {
            Self::Next(index) => Some(*index),
            Self::BackendAssigned => None,
        }
    }
}

/// Interface implemented by specific storage backends (in-memory, remote stores)
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a message in its sub-queue, at its index-ordered position.
    ///
    /// Implementations must re-verify uuid uniqueness atomically with the
    /// insertion (under their own lock or transaction) and fail with
    /// [`MultiQueueError::DuplicateMessage`] on conflict: the engine's
    /// pre-check alone is not sufficient under concurrent adds. A message
    /// carrying a pre-assigned index must land in ascending index order even
    /// when concurrent callers deliver indexes out of sequence. Returns the
    /// stored message, with the index filled in for backends that assign
    /// their own.
    async fn store(&self, message: QueueMessage) -> Result<QueueMessage, MultiQueueError>;

    /// Remove a message matched by identity equality; returns whether anything was removed
    async fn remove_message(&self, message: &QueueMessage) -> Result<bool, MultiQueueError>;

    /// All messages of a sub-queue, ordered by ascending index
    async fn sub_queue_messages(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<Vec<QueueMessage>, MultiQueueError>;

    /// Remove and return the head (lowest index) of a sub-queue
    async fn poll_sub_queue(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<Option<QueueMessage>, MultiQueueError>;

    /// Return the head of a sub-queue without removing it
    async fn peek_sub_queue(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<Option<QueueMessage>, MultiQueueError>;

    /// Remove all messages of a sub-queue; returns the count removed.
    ///
    /// Clearing also resets any per-sub-queue index counter. Clearing a
    /// sub-queue that does not exist is a no-op returning 0.
    async fn clear_sub_queue(&self, sub_queue: &SubQueueName) -> Result<usize, MultiQueueError>;

    /// Which sub-queue currently holds a message with this uuid, if any.
    ///
    /// This is the single source of truth for the global uniqueness
    /// invariant; the per-sub-queue containers are unaware of cross-sub-queue
    /// duplicates.
    async fn sub_queue_containing_uuid(
        &self,
        uuid: &MessageUuid,
    ) -> Result<Option<SubQueueName>, MultiQueueError>;

    /// Global message lookup by uuid, without knowing its sub-queue
    async fn message_by_uuid(
        &self,
        uuid: &MessageUuid,
    ) -> Result<Option<QueueMessage>, MultiQueueError>;

    /// Sub-queue identifiers known to the backend.
    ///
    /// With `include_empty` false, identifiers whose sub-queue currently
    /// holds no messages are excluded. Reserved-identifier filtering is the
    /// engine's job, not the backend's.
    async fn keys(&self, include_empty: bool) -> Result<HashSet<SubQueueName>, MultiQueueError>;

    /// Number of messages currently in a sub-queue (0 for unknown keys)
    async fn size_of(&self, sub_queue: &SubQueueName) -> Result<usize, MultiQueueError>;

    /// Number of messages across all sub-queues
    async fn total_size(&self) -> Result<usize, MultiQueueError>;

    /// Compute the next ordering index for a sub-queue, per this backend's
    /// id-generation policy (per-sub-queue counter, global counter, or
    /// backend-assigned).
    async fn next_sub_queue_index(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<SubQueueIndex, MultiQueueError>;

    /// Write an externally-mutated message back, matched by index.
    ///
    /// Must not change the message's index or ordering position. Fails with
    /// [`MultiQueueError::MessageUpdateFailed`] when no stored message
    /// matches.
    async fn update_message(&self, message: &QueueMessage) -> Result<(), MultiQueueError>;

    /// Backend-specific liveness probe.
    ///
    /// Failures may carry any backend-specific cause; the engine wraps them
    /// uniformly into [`MultiQueueError::HealthCheckFailed`].
    async fn health_probe(&self) -> anyhow::Result<()>;

    /// Get storage type
    fn storage_type(&self) -> StorageType;
}
