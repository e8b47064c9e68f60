//! Services for oplog-intake

pub mod backend;
pub mod batch;
pub mod intake_controller;
pub mod scan_client;

pub use backend::{BackendError, IntakeBackend};
pub use batch::{commit_order, BatchOutcome, BatchReport};
pub use intake_controller::IntakeController;
pub use scan_client::ScanServiceClient;
