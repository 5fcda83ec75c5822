//! Restriction authority: the state machine deciding whether a caller may
//! touch a given sub-queue.
//!
//! State is split three ways:
//! - the active [`RestrictionMode`], owned by the authority and mutable only
//!   through an explicit setter for test/ops purposes,
//! - the restricted-membership set, persisted by a [`RestrictionStore`]
//!   adapter,
//! - the reserved identifiers, computed (never persisted) from the store's
//!   own bookkeeping keys.
//!
//! The authorization decision consumed by the boundary layer is
//! [`RestrictionAuthority::can_access_sub_queue`] /
//! [`RestrictionAuthority::assert_can_access_sub_queue`]. The caller identity
//! it compares against is an opaque string resolved from a previously issued
//! token by the boundary layer; this crate never parses or validates tokens.

use crate::error::MultiQueueError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Process-wide policy governing whether sub-queue access requires a token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestrictionMode {
    /// No restriction: every sub-queue is open, membership mutation is a no-op
    #[default]
    None,
    /// Un-restricted sub-queues stay open; restricted ones require a matching
    /// caller identity
    Hybrid,
    /// Every sub-queue is opt-in: access requires registration and a matching
    /// caller identity
    Restricted,
}

impl std::fmt::Display for RestrictionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Hybrid => write!(f, "Hybrid"),
            Self::Restricted => write!(f, "Restricted"),
        }
    }
}

/// Interface implemented by restriction membership stores.
///
/// Implementations persist only the membership set; the restriction mode and
/// the reserved identifiers are not theirs to store.
#[async_trait]
pub trait RestrictionStore: Send + Sync {
    /// Insert a sub-queue into the membership set.
    ///
    /// Returns `false` without change when already present; must stay
    /// idempotent under concurrent calls for the same key.
    async fn insert(&self, sub_queue: &str) -> Result<bool, MultiQueueError>;

    /// Delete a sub-queue from the membership set; `false` when not present
    async fn delete(&self, sub_queue: &str) -> Result<bool, MultiQueueError>;

    /// Check membership
    async fn contains(&self, sub_queue: &str) -> Result<bool, MultiQueueError>;

    /// Snapshot of the current membership set
    async fn members(&self) -> Result<HashSet<String>, MultiQueueError>;

    /// Remove all membership; returns the count cleared
    async fn clear(&self) -> Result<usize, MultiQueueError>;

    /// Identifiers this store uses for its own bookkeeping.
    ///
    /// These can never be addressed as normal sub-queues: the queue engine
    /// rejects them outright so a caller cannot read or corrupt authorization
    /// metadata through the ordinary queue API. Computed, not persisted.
    fn reserved_sub_queues(&self) -> HashSet<String>;
}

/// Decides, given the current mode and the membership set, whether a caller
/// is entitled to act on a sub-queue.
pub struct RestrictionAuthority {
    store: Arc<dyn RestrictionStore>,
    mode: RwLock<RestrictionMode>,
}

impl RestrictionAuthority {
    /// Create new authority over a membership store
    pub fn new(store: Arc<dyn RestrictionStore>, mode: RestrictionMode) -> Self {
        Self {
            store,
            mode: RwLock::new(mode),
        }
    }

    /// Get the active restriction mode
    pub fn restriction_mode(&self) -> RestrictionMode {
        *self.mode.read().expect("restriction mode lock poisoned")
    }

    /// Replace the active restriction mode.
    ///
    /// Intended for test and operational tooling only; deployments configure
    /// the mode once at construction time.
    pub fn set_restriction_mode(&self, mode: RestrictionMode) {
        let mut guard = self.mode.write().expect("restriction mode lock poisoned");
        debug!(from = %*guard, to = %mode, "Restriction mode changed");
        *guard = mode;
    }

    /// Check whether a sub-queue is currently restricted.
    ///
    /// Unconditionally `false` under [`RestrictionMode::None`].
    pub async fn is_restricted(&self, sub_queue: &str) -> Result<bool, MultiQueueError> {
        if self.restriction_mode() == RestrictionMode::None {
            return Ok(false);
        }
        self.store.contains(sub_queue).await
    }

    /// Register a sub-queue as restricted.
    ///
    /// No-op returning `false` under [`RestrictionMode::None`]; otherwise
    /// idempotent, returning `true` only when the entry was newly inserted.
    pub async fn add_restricted_entry(&self, sub_queue: &str) -> Result<bool, MultiQueueError> {
        if self.restriction_mode() == RestrictionMode::None {
            debug!(
                sub_queue = %sub_queue,
                "Ignoring restriction entry, restriction mode is None"
            );
            return Ok(false);
        }

        let inserted = self.store.insert(sub_queue).await?;
        if inserted {
            debug!(sub_queue = %sub_queue, "Sub-queue registered as restricted");
        }
        Ok(inserted)
    }

    /// Remove a sub-queue's restriction.
    ///
    /// No-op returning `false` under [`RestrictionMode::None`] or when the
    /// sub-queue is not currently restricted; otherwise returns whatever the
    /// store reports for the delete.
    pub async fn remove_restriction(&self, sub_queue: &str) -> Result<bool, MultiQueueError> {
        if self.restriction_mode() == RestrictionMode::None {
            return Ok(false);
        }

        let removed = self.store.delete(sub_queue).await?;
        if removed {
            debug!(sub_queue = %sub_queue, "Sub-queue restriction removed");
        }
        Ok(removed)
    }

    /// Snapshot of the currently restricted sub-queue identifiers
    pub async fn restricted_sub_queue_identifiers(
        &self,
    ) -> Result<HashSet<String>, MultiQueueError> {
        self.store.members().await
    }

    /// Remove all restriction membership; returns the count cleared
    pub async fn clear_restricted_sub_queues(&self) -> Result<usize, MultiQueueError> {
        let cleared = self.store.clear().await?;
        if cleared > 0 {
            debug!(cleared = cleared, "Cleared restricted sub-queues");
        }
        Ok(cleared)
    }

    /// Identifiers that can never be treated as a normal sub-queue.
    ///
    /// Always empty under [`RestrictionMode::None`].
    pub fn reserved_sub_queues(&self) -> HashSet<String> {
        if self.restriction_mode() == RestrictionMode::None {
            return HashSet::new();
        }
        self.store.reserved_sub_queues()
    }

    /// The authorization decision: may `caller` act on `sub_queue`?
    ///
    /// Evaluated in order: reserved identifiers always deny; mode `None`
    /// always allows; `Hybrid` allows un-restricted sub-queues to anyone and
    /// restricted ones only to a caller whose resolved identity equals the
    /// sub-queue key; `Restricted` requires the sub-queue to be registered
    /// AND the identity to match.
    pub async fn can_access_sub_queue(
        &self,
        sub_queue: &str,
        caller: Option<&str>,
    ) -> Result<bool, MultiQueueError> {
        if self.reserved_sub_queues().contains(sub_queue) {
            warn!(sub_queue = %sub_queue, "Denied access to reserved identifier");
            return Ok(false);
        }

        match self.restriction_mode() {
            RestrictionMode::None => Ok(true),
            RestrictionMode::Hybrid => {
                if !self.store.contains(sub_queue).await? {
                    // Open access to sub-queues that never opted in
                    return Ok(true);
                }
                Ok(caller == Some(sub_queue))
            }
            RestrictionMode::Restricted => {
                Ok(self.store.contains(sub_queue).await? && caller == Some(sub_queue))
            }
        }
    }

    /// As [`Self::can_access_sub_queue`], failing with
    /// [`MultiQueueError::AuthorisationFailed`] on deny.
    pub async fn assert_can_access_sub_queue(
        &self,
        sub_queue: &str,
        caller: Option<&str>,
    ) -> Result<(), MultiQueueError> {
        if self.can_access_sub_queue(sub_queue, caller).await? {
            Ok(())
        } else {
            Err(MultiQueueError::AuthorisationFailed {
                sub_queue: sub_queue.to_string(),
            })
        }
    }
}

#[cfg(test)]
#[path = "restriction_tests.rs"]
mod tests;
