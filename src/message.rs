//! Message types for sub-queue operations including core domain identifiers.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated sub-queue name with length and character restrictions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubQueueName(String);

impl SubQueueName {
    /// Create new sub-queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        // Validate length
        if name.is_empty() || name.len() > 260 {
            return Err(ValidationError::OutOfRange {
                field: "sub_queue".to_string(),
                message: "must be 1-260 characters".to_string(),
            });
        }

        // Validate characters (ASCII alphanumeric, hyphens, underscores)
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidFormat {
                field: "sub_queue".to_string(),
                message: "only ASCII alphanumeric, hyphens, and underscores allowed".to_string(),
            });
        }

        // Validate no consecutive hyphens or leading/trailing hyphens
        if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
            return Err(ValidationError::InvalidFormat {
                field: "sub_queue".to_string(),
                message: "no leading/trailing hyphens or consecutive hyphens".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get sub-queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubQueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubQueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Globally unique message identifier.
///
/// Uniqueness is enforced across all sub-queues of one engine instance, not
/// just within the message's own sub-queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageUuid(String);

impl MessageUuid {
    /// Generate new random message uuid
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message uuid as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageUuid {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map_err(|_| ValidationError::InvalidFormat {
            field: "uuid".to_string(),
            message: "not a valid uuid".to_string(),
        })?;

        Ok(Self(s.to_string()))
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

// ============================================================================
// Message Record
// ============================================================================

/// The unit of data stored in a sub-queue.
///
/// The `index` ordinal is backend-scoped: it is assigned once, at the first
/// successful insertion, and never changes afterwards. Retrieval order within
/// a sub-queue is ascending `index`.
///
/// Logical identity is defined over `(uuid, sub_queue, payload)`; the
/// assignment owner, the index, and the enqueue timestamp are deliberately
/// excluded so that mutating assignment never breaks identity-based lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Backend-scoped ordering ordinal, `None` until assigned
    pub index: Option<u64>,
    /// Globally unique identifier across all sub-queues of one engine
    pub uuid: MessageUuid,
    /// The sub-queue this message belongs to
    pub sub_queue: SubQueueName,
    /// Opaque serializable payload
    pub payload: Value,
    /// Owner currently working on this message, if any
    pub assigned_to: Option<String>,
    /// When the backend accepted the message, recorded at store time
    pub enqueued_at: Option<Timestamp>,
}

impl QueueMessage {
    /// Create new unassigned message for a sub-queue
    pub fn new(sub_queue: SubQueueName, payload: Value) -> Self {
        Self {
            index: None,
            uuid: MessageUuid::new(),
            sub_queue,
            payload,
            assigned_to: None,
            enqueued_at: None,
        }
    }

    /// Set an explicit uuid instead of a generated one
    pub fn with_uuid(mut self, uuid: MessageUuid) -> Self {
        self.uuid = uuid;
        self
    }

    /// Set the assignment owner
    pub fn with_assigned_to(mut self, owner: impl Into<String>) -> Self {
        self.assigned_to = Some(owner.into());
        self
    }

    /// Check whether the message is currently assigned to an owner
    pub fn is_assigned(&self) -> bool {
        self.assigned_to.is_some()
    }

    /// Check whether the message is assigned to the given owner
    pub fn is_assigned_to(&self, owner: &str) -> bool {
        self.assigned_to.as_deref() == Some(owner)
    }
}

// Identity equality: (uuid, sub_queue, payload) only.
impl PartialEq for QueueMessage {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
            && self.sub_queue == other.sub_queue
            && self.payload == other.payload
    }
}

impl Eq for QueueMessage {}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
