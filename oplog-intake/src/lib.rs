//! oplog-intake library interface
//!
//! Client side of the OP log batch intake: images are queued, sent one at a
//! time to the recognition service, edited, and saved to the store.

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{IntakeError, IntakeResult};
pub use crate::models::{FieldEdit, ImagePayload, IntakeItem, ItemSummary};
pub use crate::services::{
    BackendError, BatchReport, IntakeBackend, IntakeController, ScanServiceClient,
};
