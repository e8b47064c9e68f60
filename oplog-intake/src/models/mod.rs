//! Data models for oplog-intake

pub mod field_edit;
pub mod intake_item;

pub use field_edit::FieldEdit;
pub use intake_item::{ImagePayload, IntakeItem, ItemSummary};
