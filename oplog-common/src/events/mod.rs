//! Event types for the OP Log intake event system
//!
//! Provides shared event definitions and the EventBus used to observe the
//! intake queue.

mod item_types;

pub use item_types::{FailureStage, ItemId, ItemStatus};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Intake event types
///
/// Events are broadcast via EventBus and can be serialized for display or
/// logging by any front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IntakeEvent {
    /// Images were appended to the queue
    ItemsEnqueued {
        /// New item ids, in queue order
        item_ids: Vec<ItemId>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An item moved between lifecycle states
    ///
    /// Triggers:
    /// - UI: Update status badge
    /// - UI: Show form once `Editing` is reached
    ItemStatusChanged {
        item_id: ItemId,
        old_status: ItemStatus,
        new_status: ItemStatus,
        /// User-facing message, set when `new_status` is `Failed`
        error_message: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A field value was edited
    FieldUpdated {
        item_id: ItemId,
        field: String,
        value: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An item was removed by the user
    ItemRemoved {
        item_id: ItemId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Batch save of all editing items started
    BatchPersistStarted {
        /// Items in commit order
        item_ids: Vec<ItemId>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Batch save finished
    BatchPersistCompleted {
        persisted: usize,
        failed: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl IntakeEvent {
    /// Item the event refers to, if it concerns a single item
    pub fn item_id(&self) -> Option<ItemId> {
        match self {
            IntakeEvent::ItemStatusChanged { item_id, .. }
            | IntakeEvent::FieldUpdated { item_id, .. }
            | IntakeEvent::ItemRemoved { item_id, .. } => Some(*item_id),
            _ => None,
        }
    }
}

/// Broadcast bus for intake events
///
/// Thin wrapper over `tokio::sync::broadcast`; slow subscribers lose the
/// oldest events once `capacity` is exceeded.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IntakeEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use oplog_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<IntakeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: IntakeEvent,
    ) -> Result<usize, broadcast::error::SendError<IntakeEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: IntakeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
