//! Error types for oplog-intake
//!
//! These cover misuse of the intake controller (unknown item, operation not
//! valid in the current status). Scan and save failures are not errors of
//! the controller: they are recorded on the item as `Failed`.

use oplog_common::events::{ItemId, ItemStatus};
use thiserror::Error;

/// Main error type for oplog-intake
#[derive(Debug, Error)]
pub enum IntakeError {
    /// No item with this id in the queue
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not permitted in the item's current status
    #[error("Cannot {operation} item {id} while {status}")]
    InvalidState {
        id: ItemId,
        status: ItemStatus,
        operation: &'static str,
    },

    /// A scan or save call is outstanding for the item
    #[error("Item {0} has a request in flight")]
    InFlight(ItemId),

    /// File I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// oplog-common error
    #[error("Common error: {0}")]
    Common(#[from] oplog_common::Error),
}

/// Convenience Result type using IntakeError
pub type IntakeResult<T> = Result<T, IntakeError>;
