//! Intake item identity and status types
//!
//! Supporting types shared by the intake controller and event consumers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one intake item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Generate a fresh identifier (UUIDv4)
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an intake item
///
/// ```text
/// Queued -> Recognizing -> Editing -> Persisting -> Persisted
///               |                         |
///               +--------> Failed <-------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ItemStatus {
    Queued,
    Recognizing,
    Editing,
    Persisting,
    Persisted,
    Failed,
}

impl ItemStatus {
    /// A network call is outstanding for the item
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ItemStatus::Recognizing | ItemStatus::Persisting)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Queued => write!(f, "Queued"),
            ItemStatus::Recognizing => write!(f, "Recognizing"),
            ItemStatus::Editing => write!(f, "Editing"),
            ItemStatus::Persisting => write!(f, "Persisting"),
            ItemStatus::Persisted => write!(f, "Persisted"),
            ItemStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Pipeline stage at which an item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum FailureStage {
    /// Recognition call failed ("Scan failed")
    Scan,
    /// Persist call failed ("Save failed")
    Save,
}

impl FailureStage {
    /// Message shown to the user for a failure at this stage
    pub fn message(&self) -> &'static str {
        match self {
            FailureStage::Scan => "Scan failed",
            FailureStage::Save => "Save failed",
        }
    }
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Scan => write!(f, "Scan"),
            FailureStage::Save => write!(f, "Save"),
        }
    }
}
