//! Intake item model
//!
//! One user-submitted OP log image plus the record derived from it.

use crate::error::{IntakeError, IntakeResult};
use chrono::{DateTime, Utc};
use oplog_common::events::{FailureStage, ItemId, ItemStatus};
use oplog_common::RecordFields;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Immutable image bytes with the metadata needed to upload them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// File name sent with the upload
    pub file_name: String,
    /// MIME type, e.g. `image/jpeg`
    pub mime_type: String,
    /// Display-only reference to the source (path or name)
    pub preview: String,
    data: Arc<[u8]>,
}

impl ImagePayload {
    /// Wrap in-memory bytes; the MIME type is sniffed from the content
    pub fn from_bytes(file_name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        let file_name = file_name.into();
        let data = data.into();
        let mime_type = infer::get(&data)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Self {
            preview: file_name.clone(),
            file_name,
            mime_type,
            data,
        }
    }

    /// Read an image file from disk
    ///
    /// Files whose content is not a recognised image format are rejected.
    pub fn from_path(path: &Path) -> IntakeResult<Self> {
        let data = std::fs::read(path)?;
        if !infer::is_image(&data) {
            return Err(IntakeError::InvalidInput(format!(
                "{} is not an image",
                path.display()
            )));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let mut payload = Self::from_bytes(file_name, data);
        payload.preview = path.display().to_string();
        Ok(payload)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One image moving through the scan → edit → save pipeline
#[derive(Debug, Clone)]
pub struct IntakeItem {
    pub id: ItemId,
    pub image: ImagePayload,
    pub status: ItemStatus,
    /// Empty until recognition succeeds, never empty afterwards
    pub fields: RecordFields,
    /// Set only while `Failed`
    pub error_message: String,
    /// Stage that failed; set only while `Failed`
    pub failed_stage: Option<FailureStage>,
    pub enqueued_at: DateTime<Utc>,
}

impl IntakeItem {
    /// Create a new queued item
    pub fn new(image: ImagePayload) -> Self {
        Self {
            id: ItemId::generate(),
            image,
            status: ItemStatus::Queued,
            fields: RecordFields::new(),
            error_message: String::new(),
            failed_stage: None,
            enqueued_at: Utc::now(),
        }
    }

    /// Recognized fields exist and may be edited
    pub fn has_record(&self) -> bool {
        match self.status {
            ItemStatus::Editing | ItemStatus::Persisting | ItemStatus::Persisted => true,
            ItemStatus::Failed => self.failed_stage == Some(FailureStage::Save),
            ItemStatus::Queued | ItemStatus::Recognizing => false,
        }
    }

    /// Mark as failed at the given stage
    pub(crate) fn fail(&mut self, stage: FailureStage) {
        self.status = ItemStatus::Failed;
        self.error_message = stage.message().to_string();
        self.failed_stage = Some(stage);
    }

    /// Clear failure details
    pub(crate) fn clear_failure(&mut self) {
        self.error_message.clear();
        self.failed_stage = None;
    }
}

/// Serializable view of an item for reports
#[derive(Debug, Clone, Serialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub file: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub fields: RecordFields,
}

impl From<&IntakeItem> for ItemSummary {
    fn from(item: &IntakeItem) -> Self {
        Self {
            id: item.id,
            file: item.image.preview.clone(),
            status: item.status,
            error: (!item.error_message.is_empty()).then(|| item.error_message.clone()),
            fields: item.fields.clone(),
        }
    }
}
