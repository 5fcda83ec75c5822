//! In-memory storage adapters for testing, development, and single-process
//! deployments.
//!
//! Both adapters keep their state behind a single `tokio::sync::RwLock`, so
//! the duplicate check, the insertion, and the uuid-index update happen under
//! one write guard: two racing `add` calls for the same uuid cannot both pass
//! the check. No lock is ever held across I/O because these adapters perform
//! none.

use crate::backend::{StorageBackend, StorageType, SubQueueIndex};
use crate::config::InMemoryConfig;
use crate::error::MultiQueueError;
use crate::message::{MessageUuid, QueueMessage, SubQueueName, Timestamp};
use crate::restriction::RestrictionStore;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::RwLock;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// Storage key under which a persistent restriction store would keep the
/// membership set; doubles as this store's reserved identifier.
pub const RESTRICTED_SET_KEY: &str = "__restricted_sub_queues__";

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// State for a single sub-queue
struct SubQueueState {
    /// Messages in ascending index order; maintained on insertion
    messages: VecDeque<QueueMessage>,
    /// Next index to hand out; starts at 1, reset when the sub-queue is cleared
    next_index: u64,
}

impl SubQueueState {
    fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            next_index: 1,
        }
    }

    fn take_next_index(&mut self) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }
}

/// Guarded storage for all sub-queues of one backend
struct MemoryStorage {
    sub_queues: HashMap<SubQueueName, SubQueueState>,
    /// Global uuid index; the only place cross-sub-queue uniqueness is tested
    uuid_index: HashMap<MessageUuid, SubQueueName>,
}

impl MemoryStorage {
    fn new() -> Self {
        Self {
            sub_queues: HashMap::new(),
            uuid_index: HashMap::new(),
        }
    }
}

// ============================================================================
// InMemoryBackend
// ============================================================================

/// In-memory storage backend.
///
/// Index policy: a per-sub-queue counter starting at 1, incrementing on each
/// [`StorageBackend::next_sub_queue_index`] call and reset when the sub-queue
/// is cleared.
pub struct InMemoryBackend {
    storage: RwLock<MemoryStorage>,
    config: InMemoryConfig,
}

impl InMemoryBackend {
    /// Create new in-memory backend with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            storage: RwLock::new(MemoryStorage::new()),
            config,
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn store(&self, message: QueueMessage) -> Result<QueueMessage, MultiQueueError> {
        let mut storage = self.storage.write().await;
        let MemoryStorage {
            sub_queues,
            uuid_index,
        } = &mut *storage;

        if let Some(existing) = uuid_index.get(&message.uuid) {
            return Err(MultiQueueError::DuplicateMessage {
                uuid: message.uuid.to_string(),
                existing_sub_queue: existing.to_string(),
            });
        }

        let state = sub_queues
            .entry(message.sub_queue.clone())
            .or_insert_with(SubQueueState::new);

        if state.messages.len() >= self.config.max_sub_queue_size {
            return Err(MultiQueueError::Storage {
                backend: StorageType::InMemory.to_string(),
                message: format!(
                    "sub-queue '{}' is at capacity ({} messages)",
                    message.sub_queue, self.config.max_sub_queue_size
                ),
            });
        }

        let mut message = message;
        if message.index.is_none() {
            message.index = Some(state.take_next_index());
        }
        message.enqueued_at = Some(Timestamp::now());

        // Racing adds can reach the store out of index sequence after taking
        // their indexes separately; inserting at the sorted position keeps
        // the sub-queue in ascending index order either way.
        let position = state
            .messages
            .iter()
            .position(|stored| stored.index > message.index)
            .unwrap_or(state.messages.len());
        state.messages.insert(position, message.clone());
        uuid_index.insert(message.uuid.clone(), message.sub_queue.clone());
        Ok(message)
    }

    async fn remove_message(&self, message: &QueueMessage) -> Result<bool, MultiQueueError> {
        let mut storage = self.storage.write().await;
        let MemoryStorage {
            sub_queues,
            uuid_index,
        } = &mut *storage;

        let Some(state) = sub_queues.get_mut(&message.sub_queue) else {
            return Ok(false);
        };

        // Identity equality: (uuid, sub_queue, payload)
        let Some(position) = state.messages.iter().position(|stored| stored == message) else {
            return Ok(false);
        };

        let removed = state.messages.remove(position);
        if let Some(removed) = removed {
            uuid_index.remove(&removed.uuid);
        }
        Ok(true)
    }

    async fn sub_queue_messages(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<Vec<QueueMessage>, MultiQueueError> {
        let storage = self.storage.read().await;
        Ok(storage
            .sub_queues
            .get(sub_queue)
            .map(|state| state.messages.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn poll_sub_queue(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<Option<QueueMessage>, MultiQueueError> {
        let mut storage = self.storage.write().await;
        let MemoryStorage {
            sub_queues,
            uuid_index,
        } = &mut *storage;

        let Some(state) = sub_queues.get_mut(sub_queue) else {
            return Ok(None);
        };

        let polled = state.messages.pop_front();
        if let Some(ref message) = polled {
            uuid_index.remove(&message.uuid);
        }
        Ok(polled)
    }

    async fn peek_sub_queue(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<Option<QueueMessage>, MultiQueueError> {
        let storage = self.storage.read().await;
        Ok(storage
            .sub_queues
            .get(sub_queue)
            .and_then(|state| state.messages.front().cloned()))
    }

    async fn clear_sub_queue(&self, sub_queue: &SubQueueName) -> Result<usize, MultiQueueError> {
        let mut storage = self.storage.write().await;
        let MemoryStorage {
            sub_queues,
            uuid_index,
        } = &mut *storage;

        // Removing the whole entry also resets the index counter
        let Some(state) = sub_queues.remove(sub_queue) else {
            return Ok(0);
        };

        for message in &state.messages {
            uuid_index.remove(&message.uuid);
        }
        Ok(state.messages.len())
    }

    async fn sub_queue_containing_uuid(
        &self,
        uuid: &MessageUuid,
    ) -> Result<Option<SubQueueName>, MultiQueueError> {
        let storage = self.storage.read().await;
        Ok(storage.uuid_index.get(uuid).cloned())
    }

    async fn message_by_uuid(
        &self,
        uuid: &MessageUuid,
    ) -> Result<Option<QueueMessage>, MultiQueueError> {
        let storage = self.storage.read().await;
        let Some(sub_queue) = storage.uuid_index.get(uuid) else {
            return Ok(None);
        };
        Ok(storage.sub_queues.get(sub_queue).and_then(|state| {
            state
                .messages
                .iter()
                .find(|message| message.uuid == *uuid)
                .cloned()
        }))
    }

    async fn keys(&self, include_empty: bool) -> Result<HashSet<SubQueueName>, MultiQueueError> {
        let storage = self.storage.read().await;
        Ok(storage
            .sub_queues
            .iter()
            .filter(|(_, state)| include_empty || !state.messages.is_empty())
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn size_of(&self, sub_queue: &SubQueueName) -> Result<usize, MultiQueueError> {
        let storage = self.storage.read().await;
        Ok(storage
            .sub_queues
            .get(sub_queue)
            .map(|state| state.messages.len())
            .unwrap_or(0))
    }

    async fn total_size(&self) -> Result<usize, MultiQueueError> {
        let storage = self.storage.read().await;
        Ok(storage
            .sub_queues
            .values()
            .map(|state| state.messages.len())
            .sum())
    }

    async fn next_sub_queue_index(
        &self,
        sub_queue: &SubQueueName,
    ) -> Result<SubQueueIndex, MultiQueueError> {
        let mut storage = self.storage.write().await;
        let state = storage
            .sub_queues
            .entry(sub_queue.clone())
            .or_insert_with(SubQueueState::new);
        Ok(SubQueueIndex::Next(state.take_next_index()))
    }

    async fn update_message(&self, message: &QueueMessage) -> Result<(), MultiQueueError> {
        let Some(index) = message.index else {
            return Err(MultiQueueError::MessageUpdateFailed {
                uuid: message.uuid.to_string(),
                message: "message has no assigned index".to_string(),
            });
        };

        let mut storage = self.storage.write().await;
        let Some(state) = storage.sub_queues.get_mut(&message.sub_queue) else {
            return Err(MultiQueueError::MessageUpdateFailed {
                uuid: message.uuid.to_string(),
                message: format!("no such sub-queue '{}'", message.sub_queue),
            });
        };

        // Matched by index, never re-derived; position is left untouched
        let Some(stored) = state
            .messages
            .iter_mut()
            .find(|stored| stored.index == Some(index))
        else {
            return Err(MultiQueueError::MessageUpdateFailed {
                uuid: message.uuid.to_string(),
                message: format!("no stored message with index {}", index),
            });
        };

        if stored.uuid != message.uuid {
            return Err(MultiQueueError::MessageUpdateFailed {
                uuid: message.uuid.to_string(),
                message: format!("index {} belongs to a different message", index),
            });
        }

        stored.payload = message.payload.clone();
        stored.assigned_to = message.assigned_to.clone();
        Ok(())
    }

    async fn health_probe(&self) -> anyhow::Result<()> {
        // Liveness here means the storage lock is acquirable
        let _storage = self.storage.read().await;
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::InMemory
    }
}

// ============================================================================
// InMemoryRestrictionStore
// ============================================================================

/// In-memory restriction membership store.
///
/// Reserves [`RESTRICTED_SET_KEY`] so the identifier a persistent store would
/// keep its membership under can never be addressed as a user sub-queue, even
/// in single-process deployments.
pub struct InMemoryRestrictionStore {
    members: RwLock<HashSet<String>>,
}

impl InMemoryRestrictionStore {
    /// Create new empty membership store
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashSet::new()),
        }
    }
}

impl Default for InMemoryRestrictionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RestrictionStore for InMemoryRestrictionStore {
    async fn insert(&self, sub_queue: &str) -> Result<bool, MultiQueueError> {
        let mut members = self.members.write().await;
        Ok(members.insert(sub_queue.to_string()))
    }

    async fn delete(&self, sub_queue: &str) -> Result<bool, MultiQueueError> {
        let mut members = self.members.write().await;
        Ok(members.remove(sub_queue))
    }

    async fn contains(&self, sub_queue: &str) -> Result<bool, MultiQueueError> {
        let members = self.members.read().await;
        Ok(members.contains(sub_queue))
    }

    async fn members(&self) -> Result<HashSet<String>, MultiQueueError> {
        let members = self.members.read().await;
        Ok(members.clone())
    }

    async fn clear(&self) -> Result<usize, MultiQueueError> {
        let mut members = self.members.write().await;
        let cleared = members.len();
        members.clear();
        Ok(cleared)
    }

    fn reserved_sub_queues(&self) -> HashSet<String> {
        HashSet::from([RESTRICTED_SET_KEY.to_string()])
    }
}
