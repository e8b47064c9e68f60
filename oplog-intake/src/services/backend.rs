//! Remote recognition/store seam
//!
//! The controller only knows these two operations; the HTTP client is the
//! production implementation and tests substitute scripted backends.

use crate::models::ImagePayload;
use oplog_common::RecordFields;
use thiserror::Error;

/// Failure of a backend call
///
/// The controller collapses every variant into "Scan failed" / "Save failed";
/// the detail only reaches the log.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Service returned HTTP {0}")]
    Status(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Recognition service and record store
#[async_trait::async_trait]
pub trait IntakeBackend: Send + Sync {
    /// Extract record fields from one image
    async fn recognize(&self, image: &ImagePayload) -> Result<RecordFields, BackendError>;

    /// Commit one record to the store
    async fn persist(&self, fields: &RecordFields) -> Result<(), BackendError>;
}
