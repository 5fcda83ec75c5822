//! Shared queue engine semantics over an arbitrary storage backend.
//!
//! [`MultiQueue`] implements the full engine contract once — duplicate
//! detection, ordering, assignment queries, reserved-identifier protection,
//! health-check wrapping — delegating raw storage to a
//! [`StorageBackend`](crate::backend::StorageBackend) adapter. Every backend
//! gets identical semantics; only the primitive operations differ.

use crate::backend::{StorageBackend, StorageType, SubQueueIndex};
use crate::backends::memory::{InMemoryBackend, InMemoryRestrictionStore};
use crate::config::{MultiQueueConfig, StorageConfig};
use crate::error::MultiQueueError;
use crate::message::{MessageUuid, QueueMessage, SubQueueName};
use crate::restriction::RestrictionAuthority;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

/// Queue engine owning all sub-queue collections for one backend
pub struct MultiQueue {
    backend: Arc<dyn StorageBackend>,
    authority: Arc<RestrictionAuthority>,
}

impl MultiQueue {
    /// Create new engine over a backend and a restriction authority.
    ///
    /// The authority is consulted for reserved identifiers on every
    /// insertion and enumeration; authorization decisions themselves stay
    /// with the boundary layer.
    pub fn new(backend: Arc<dyn StorageBackend>, authority: Arc<RestrictionAuthority>) -> Self {
        Self { backend, authority }
    }

    /// The restriction authority paired with this engine
    pub fn authority(&self) -> &Arc<RestrictionAuthority> {
        &self.authority
    }

    /// Get backend storage type
    pub fn storage_type(&self) -> StorageType {
        self.backend.storage_type()
    }

    fn ensure_not_reserved(&self, sub_queue: &SubQueueName) -> Result<(), MultiQueueError> {
        if self
            .authority
            .reserved_sub_queues()
            .contains(sub_queue.as_str())
        {
            return Err(MultiQueueError::IllegalSubQueueIdentifier {
                sub_queue: sub_queue.to_string(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Insertion and removal
    // ========================================================================

    /// Add a message to its sub-queue.
    ///
    /// Fails with [`MultiQueueError::IllegalSubQueueIdentifier`] for reserved
    /// identifiers and [`MultiQueueError::DuplicateMessage`] when the uuid
    /// already exists in any sub-queue of this engine. On success the index
    /// is assigned per the backend's id-generation policy and the stored
    /// message is returned.
    ///
    /// # Example
    ///
    /// ```rust
    /// use multiqueue_runtime::{MultiQueueFactory, QueueMessage, SubQueueName};
    /// use serde_json::json;
    ///
    /// # tokio_test::block_on(async {
    /// let engine = MultiQueueFactory::create_test_engine();
    /// let sub_queue = SubQueueName::new("orders".to_string()).unwrap();
    ///
    /// let stored = engine
    ///     .add(QueueMessage::new(sub_queue, json!({"id": 42})))
    ///     .await
    ///     .unwrap();
    /// assert_eq!(stored.index, Some(1));
    /// # });
    /// ```
    pub async fn add(&self, message: QueueMessage) -> Result<QueueMessage, MultiQueueError> {
        self.ensure_not_reserved(&message.sub_queue)?;

        // Cheap pre-check against the uuid index; the backend re-verifies
        // atomically with the insertion.
        if let Some(existing) = self
            .backend
            .sub_queue_containing_uuid(&message.uuid)
            .await?
        {
            return Err(MultiQueueError::DuplicateMessage {
                uuid: message.uuid.to_string(),
                existing_sub_queue: existing.to_string(),
            });
        }

        let mut message = message;
        match self
            .backend
            .next_sub_queue_index(&message.sub_queue)
            .await?
        {
            SubQueueIndex::Next(index) => message.index = Some(index),
            SubQueueIndex::BackendAssigned => message.index = None,
        }

        let stored = self.backend.store(message).await?;
        debug!(
            sub_queue = %stored.sub_queue,
            uuid = %stored.uuid,
            index = ?stored.index,
            "Message added"
        );
        Ok(stored)
    }

    /// Remove a message by identity; returns whether anything was removed
    pub async fn remove(&self, message: &QueueMessage) -> Result<bool, MultiQueueError> {
        let removed = self.backend.remove_message(message).await?;
        if removed {
            debug!(sub_queue = %message.sub_queue, uuid = %message.uuid, "Message removed");
        }
        Ok(removed)
    }

    /// Remove every matching message; returns whether any was removed
    pub async fn remove_all(&self, messages: &[QueueMessage]) -> Result<bool, MultiQueueError> {
        let mut any_removed = false;
        for message in messages {
            if self.backend.remove_message(message).await? {
                any_removed = true;
            }
        }
        Ok(any_removed)
    }

    // ========================================================================
    // Identity lookups
    // ========================================================================

    /// Check whether a logically identical message is stored
    pub async fn contains(&self, message: &QueueMessage) -> Result<bool, MultiQueueError> {
        match self.backend.message_by_uuid(&message.uuid).await? {
            Some(found) => Ok(found == *message),
            None => Ok(false),
        }
    }

    /// Check whether every given message is stored
    pub async fn contains_all(&self, messages: &[QueueMessage]) -> Result<bool, MultiQueueError> {
        for message in messages {
            if !self.contains(message).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Global lookup by uuid across all sub-queues
    pub async fn message_by_uuid(
        &self,
        uuid: &MessageUuid,
    ) -> Result<Option<QueueMessage>, MultiQueueError> {
        self.backend.message_by_uuid(uuid).await
    }

    // ========================================================================
    // Sub-queue access
    // ========================================================================

    /// Remove and return the head (lowest index) of the named sub-queue
    pub async fn poll_sub_queue(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<Option<QueueMessage>, MultiQueueError> {
        let polled = self.backend.poll_sub_queue(sub_queue).await?;
        if let Some(ref message) = polled {
            debug!(sub_queue = %sub_queue, uuid = %message.uuid, "Message polled");
        }
        Ok(polled)
    }

    /// Return the head of the named sub-queue without removing it
    pub async fn peek_sub_queue(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<Option<QueueMessage>, MultiQueueError> {
        self.backend.peek_sub_queue(sub_queue).await
    }

    /// Remove all messages for one sub-queue; returns the count removed.
    ///
    /// Clearing a sub-queue that was never created is a no-op returning 0.
    pub async fn clear_sub_queue(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<usize, MultiQueueError> {
        let removed = self.backend.clear_sub_queue(sub_queue).await?;
        if removed > 0 {
            debug!(sub_queue = %sub_queue, removed = removed, "Sub-queue cleared");
        }
        Ok(removed)
    }

    /// Check whether the named sub-queue holds no messages.
    ///
    /// A sub-queue with zero messages is indistinguishable from one that was
    /// never created.
    pub async fn is_empty_sub_queue(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<bool, MultiQueueError> {
        Ok(self.backend.size_of(sub_queue).await? == 0)
    }

    /// Check whether the whole engine holds no messages
    pub async fn is_empty(&self) -> Result<bool, MultiQueueError> {
        Ok(self.backend.total_size().await? == 0)
    }

    /// Number of messages currently in the named sub-queue
    pub async fn size_of_sub_queue(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<usize, MultiQueueError> {
        self.backend.size_of(sub_queue).await
    }

    /// Number of messages across all sub-queues
    pub async fn size(&self) -> Result<usize, MultiQueueError> {
        self.backend.total_size().await
    }

    /// The set of sub-queue identifiers.
    ///
    /// With `include_empty` false, identifiers whose sub-queue is currently
    /// empty are excluded. Reserved identifiers are always excluded, even if
    /// somehow present in the backend's raw enumeration.
    pub async fn keys(
        &self,
        include_empty: bool,
    ) -> Result<HashSet<SubQueueName>, MultiQueueError> {
        let reserved = self.authority.reserved_sub_queues();
        let keys = self.backend.keys(include_empty).await?;
        Ok(keys
            .into_iter()
            .filter(|key| !reserved.contains(key.as_str()))
            .collect())
    }

    /// The ordered (ascending index) list of all messages in a sub-queue.
    ///
    /// Fails with [`MultiQueueError::IllegalSubQueueIdentifier`] for reserved
    /// identifiers.
    pub async fn sub_queue(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<Vec<QueueMessage>, MultiQueueError> {
        self.ensure_not_reserved(sub_queue)?;
        self.backend.sub_queue_messages(sub_queue).await
    }

    // ========================================================================
    // Assignment queries
    // ========================================================================

    /// Messages in a sub-queue with a non-null owner, optionally filtered to
    /// one owner; order preserved.
    pub async fn assigned_messages_in_sub_queue(
        &self,
        sub_queue: &SubQueueName,
        owner: Option<&str>,
    ) -> Result<Vec<QueueMessage>, MultiQueueError> {
        let messages = self.sub_queue(sub_queue).await?;
        Ok(messages
            .into_iter()
            .filter(|message| match owner {
                Some(owner) => message.is_assigned_to(owner),
                None => message.is_assigned(),
            })
            .collect())
    }

    /// Messages in a sub-queue with no owner; order preserved
    pub async fn unassigned_messages_in_sub_queue(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<Vec<QueueMessage>, MultiQueueError> {
        let messages = self.sub_queue(sub_queue).await?;
        Ok(messages
            .into_iter()
            .filter(|message| !message.is_assigned())
            .collect())
    }

    /// Map from owner identifier to the set of sub-queue keys in which that
    /// owner currently has at least one assigned message.
    ///
    /// When `sub_queue` is given, restricted to that sub-queue; otherwise
    /// aggregated over all sub-queues.
    pub async fn owners_and_keys_map(
        &self,
        sub_queue: Option<&SubQueueName>,
    ) -> Result<HashMap<String, HashSet<String>>, MultiQueueError> {
        let keys: Vec<SubQueueName> = match sub_queue {
            Some(key) => vec![key.clone()],
            None => self.keys(false).await?.into_iter().collect(),
        };

        let mut owners: HashMap<String, HashSet<String>> = HashMap::new();
        for key in keys {
            for message in self.sub_queue(&key).await? {
                if let Some(owner) = message.assigned_to {
                    owners
                        .entry(owner)
                        .or_default()
                        .insert(key.as_str().to_string());
                }
            }
        }
        Ok(owners)
    }

    // ========================================================================
    // Persistence and health
    // ========================================================================

    /// Flush an externally-mutated message back to the backend.
    ///
    /// The message must already exist, matched by its index — never
    /// re-derived. Fails with [`MultiQueueError::MessageUpdateFailed`] when
    /// the index is unset or unknown. The index and ordering position never
    /// change.
    pub async fn persist_message(&self, message: &QueueMessage) -> Result<(), MultiQueueError> {
        if message.index.is_none() {
            return Err(MultiQueueError::MessageUpdateFailed {
                uuid: message.uuid.to_string(),
                message: "message has no assigned index".to_string(),
            });
        }
        self.backend.update_message(message).await
    }

    /// Compute the next ordering index for a sub-queue, per the backend's
    /// id-generation policy.
    pub async fn next_sub_queue_index(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<SubQueueIndex, MultiQueueError> {
        self.backend.next_sub_queue_index(sub_queue).await
    }

    /// Invoke the backend's liveness probe.
    ///
    /// Any underlying failure is wrapped into
    /// [`MultiQueueError::HealthCheckFailed`] with the original cause
    /// preserved; backend-specific error shapes never leak.
    pub async fn perform_health_check(&self) -> Result<(), MultiQueueError> {
        self.backend
            .health_probe()
            .await
            .map_err(MultiQueueError::health_check)
    }

    // ========================================================================
    // Unsupported single-queue surface
    // ========================================================================
    //
    // The engine deliberately exposes the familiar unqualified queue shape
    // while refusing it, forcing callers through the sub-queue-qualified API.

    /// Unqualified peek is not supported; use [`Self::peek_sub_queue`]
    pub fn peek(&self) -> Result<Option<QueueMessage>, MultiQueueError> {
        Err(Self::unsupported("peek"))
    }

    /// Unqualified poll is not supported; use [`Self::poll_sub_queue`]
    pub fn poll(&self) -> Result<Option<QueueMessage>, MultiQueueError> {
        Err(Self::unsupported("poll"))
    }

    /// Unqualified offer is not supported; use [`Self::add`]
    pub fn offer(&self, _message: QueueMessage) -> Result<bool, MultiQueueError> {
        Err(Self::unsupported("offer"))
    }

    /// Unqualified head element access is not supported; use [`Self::peek_sub_queue`]
    pub fn element(&self) -> Result<QueueMessage, MultiQueueError> {
        Err(Self::unsupported("element"))
    }

    /// Unqualified head removal is not supported; use [`Self::poll_sub_queue`]
    pub fn remove_front(&self) -> Result<QueueMessage, MultiQueueError> {
        Err(Self::unsupported("remove"))
    }

    /// Whole-engine iteration is not supported; use [`Self::sub_queue`]
    pub fn iter(&self) -> Result<std::vec::IntoIter<QueueMessage>, MultiQueueError> {
        Err(Self::unsupported("iterator"))
    }

    fn unsupported(operation: &str) -> MultiQueueError {
        MultiQueueError::UnsupportedOperation {
            operation: operation.to_string(),
        }
    }
}

/// Factory for creating engines with appropriate backends
pub struct MultiQueueFactory;

impl MultiQueueFactory {
    /// Build an engine and its restriction authority from configuration.
    ///
    /// All backend handles are constructed here, explicitly; nothing is
    /// injected after the fact. The paired authority is reachable through
    /// [`MultiQueue::authority`].
    pub fn create(config: MultiQueueConfig) -> Result<MultiQueue, MultiQueueError> {
        match config.storage {
            StorageConfig::InMemory(memory_config) => {
                let store = Arc::new(InMemoryRestrictionStore::new());
                let authority = Arc::new(RestrictionAuthority::new(
                    store,
                    config.restriction_mode,
                ));
                let backend = Arc::new(InMemoryBackend::new(memory_config));
                Ok(MultiQueue::new(backend, authority))
            }
        }
    }

    /// Create an engine with an in-memory backend and default configuration
    pub fn create_test_engine() -> MultiQueue {
        Self::create(MultiQueueConfig::default())
            .expect("default in-memory configuration is always valid")
    }
}
