//! Intake Queue Controller
//!
//! Owns the ordered list of intake items and drives each through
//! recognition and persistence.
//!
//! **Concurrency:**
//! - At most one recognition call is outstanding. The `busy` flag is checked
//!   and set under the state mutex, so this holds on a multi-threaded runtime.
//! - Recognition is FIFO in insertion order and needs no user action between
//!   items: every state change ends with [`IntakeController::try_advance`].
//! - Saves of different items may overlap; the batch save runs them one at a
//!   time in record date order.
//!
//! The state mutex is never held across an `.await`.

use super::backend::IntakeBackend;
use super::batch::{commit_order, BatchOutcome, BatchReport};
use crate::error::{IntakeError, IntakeResult};
use crate::models::{ImagePayload, IntakeItem};
use oplog_common::events::{EventBus, FailureStage, IntakeEvent, ItemId, ItemStatus};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Default)]
struct QueueState {
    items: Vec<IntakeItem>,
    /// A recognition call is outstanding
    busy: bool,
}

impl QueueState {
    fn get(&self, id: ItemId) -> Option<&IntakeItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn get_mut(&mut self, id: ItemId) -> IntakeResult<&mut IntakeItem> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(IntakeError::NotFound(id))
    }
}

struct Shared {
    state: Mutex<QueueState>,
    backend: Arc<dyn IntakeBackend>,
    event_bus: EventBus,
    /// Bumped on every state change; drives `wait_until_idle`
    revision: watch::Sender<u64>,
}

/// Batch intake queue
///
/// Cloning is cheap and yields a handle to the same queue. Must be used from
/// within a Tokio runtime: recognition calls are spawned as tasks.
#[derive(Clone)]
pub struct IntakeController {
    shared: Arc<Shared>,
}

impl IntakeController {
    pub fn new(backend: Arc<dyn IntakeBackend>, event_bus: EventBus) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                backend,
                event_bus,
                revision,
            }),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.shared.event_bus
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_changed(&self) {
        self.shared.revision.send_modify(|r| *r = r.wrapping_add(1));
    }

    fn emit_status(
        &self,
        item_id: ItemId,
        old_status: ItemStatus,
        new_status: ItemStatus,
        error_message: Option<String>,
    ) {
        self.shared
            .event_bus
            .emit_lossy(IntakeEvent::ItemStatusChanged {
                item_id,
                old_status,
                new_status,
                error_message,
                timestamp: chrono::Utc::now(),
            });
    }

    // ------------------------------------------------------------------
    // Queue operations
    // ------------------------------------------------------------------

    /// Append one `Queued` item per image, in order
    pub fn enqueue(&self, images: Vec<ImagePayload>) -> IntakeResult<Vec<ItemId>> {
        if images.is_empty() {
            return Err(IntakeError::InvalidInput(
                "at least one image is required".to_string(),
            ));
        }

        let ids: Vec<ItemId> = {
            let mut state = self.lock();
            images
                .into_iter()
                .map(|image| {
                    let item = IntakeItem::new(image);
                    let id = item.id;
                    state.items.push(item);
                    id
                })
                .collect()
        };

        info!(count = ids.len(), "Images enqueued");
        self.shared.event_bus.emit_lossy(IntakeEvent::ItemsEnqueued {
            item_ids: ids.clone(),
            timestamp: chrono::Utc::now(),
        });
        self.mark_changed();
        self.try_advance();

        Ok(ids)
    }

    /// Start recognizing the next queued item, if idle
    ///
    /// Safe to call at any time: a no-op while a recognition is outstanding
    /// or when nothing is queued.
    pub fn try_advance(&self) {
        let (id, image) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            if state.busy {
                return;
            }
            let Some(item) = state
                .items
                .iter_mut()
                .find(|item| item.status == ItemStatus::Queued)
            else {
                return;
            };

            item.status = ItemStatus::Recognizing;
            state.busy = true;
            (item.id, item.image.clone())
        };

        debug!(item = %id, file = %image.file_name, "Recognition started");
        self.emit_status(id, ItemStatus::Queued, ItemStatus::Recognizing, None);
        self.mark_changed();

        let controller = self.clone();
        tokio::spawn(async move {
            controller.run_recognition(id, image).await;
        });
    }

    async fn run_recognition(&self, id: ItemId, image: ImagePayload) {
        let result = self.shared.backend.recognize(&image).await;

        let outcome = {
            let mut guard = self.lock();
            let state = &mut *guard;
            state.busy = false;

            match state.items.iter_mut().find(|item| item.id == id) {
                Some(item) => {
                    match result {
                        Ok(fields) if !fields.is_empty() => {
                            item.fields = fields;
                            item.status = ItemStatus::Editing;
                        }
                        Ok(_) => {
                            warn!(item = %id, "Recognition returned no fields");
                            item.fail(FailureStage::Scan);
                        }
                        Err(e) => {
                            warn!(item = %id, error = %e, "Recognition failed");
                            item.fail(FailureStage::Scan);
                        }
                    }
                    Some((item.status, item.failed_stage))
                }
                None => {
                    warn!(item = %id, "Recognized item no longer queued, result dropped");
                    None
                }
            }
        };

        if let Some((status, stage)) = outcome {
            if status == ItemStatus::Editing {
                info!(item = %id, "Recognition complete");
            }
            self.emit_status(
                id,
                ItemStatus::Recognizing,
                status,
                stage.map(|s| s.message().to_string()),
            );
        }
        self.mark_changed();

        self.try_advance();
    }

    /// Set one record field
    ///
    /// Allowed once the item holds recognized fields (`Editing`,
    /// `Persisting`, `Persisted`, or failed while saving). An edit made while
    /// `Persisting` is not part of the outstanding save, which sends the
    /// fields as they were when it started; save again to send it.
    pub fn update_field(
        &self,
        id: ItemId,
        field: &str,
        value: impl Into<String>,
    ) -> IntakeResult<()> {
        let field = field.trim();
        if field.is_empty() {
            return Err(IntakeError::InvalidInput(
                "field name must not be blank".to_string(),
            ));
        }
        let value = value.into();

        {
            let mut state = self.lock();
            let item = state.get_mut(id)?;
            if !item.has_record() {
                return Err(IntakeError::InvalidState {
                    id,
                    status: item.status,
                    operation: "edit",
                });
            }
            item.fields.set(field, value.clone());
        }

        self.shared.event_bus.emit_lossy(IntakeEvent::FieldUpdated {
            item_id: id,
            field: field.to_string(),
            value,
            timestamp: chrono::Utc::now(),
        });
        self.mark_changed();
        self.try_advance();

        Ok(())
    }

    /// Read one record field; unset fields read as `None`
    pub fn field(&self, id: ItemId, field: &str) -> IntakeResult<Option<String>> {
        let state = self.lock();
        let item = state.get(id).ok_or(IntakeError::NotFound(id))?;
        Ok(item.fields.get(field).map(str::to_string))
    }

    /// Delete an item
    ///
    /// Fails with `NotFound` for unknown ids and `InFlight` while a scan or
    /// save call is outstanding for the item.
    pub fn remove(&self, id: ItemId) -> IntakeResult<()> {
        {
            let mut state = self.lock();
            let index = state
                .items
                .iter()
                .position(|item| item.id == id)
                .ok_or(IntakeError::NotFound(id))?;
            if state.items[index].status.is_in_flight() {
                return Err(IntakeError::InFlight(id));
            }
            state.items.remove(index);
        }

        info!(item = %id, "Item removed");
        self.shared.event_bus.emit_lossy(IntakeEvent::ItemRemoved {
            item_id: id,
            timestamp: chrono::Utc::now(),
        });
        self.mark_changed();
        self.try_advance();

        Ok(())
    }

    /// Re-run the stage that failed
    ///
    /// A failed scan goes back to `Queued` and is picked up by the drain loop;
    /// the returned status is `Queued`. A failed save re-submits the kept
    /// fields and returns the resulting status.
    pub async fn retry(&self, id: ItemId) -> IntakeResult<ItemStatus> {
        let stage = {
            let mut state = self.lock();
            let item = state.get_mut(id)?;
            if item.status != ItemStatus::Failed {
                return Err(IntakeError::InvalidState {
                    id,
                    status: item.status,
                    operation: "retry",
                });
            }

            let stage = item.failed_stage.unwrap_or(FailureStage::Scan);
            if stage == FailureStage::Scan {
                item.clear_failure();
                item.fields.clear();
                item.status = ItemStatus::Queued;
            }
            stage
        };

        info!(item = %id, stage = %stage, "Retrying failed item");

        match stage {
            FailureStage::Scan => {
                self.emit_status(id, ItemStatus::Failed, ItemStatus::Queued, None);
                self.mark_changed();
                self.try_advance();
                Ok(ItemStatus::Queued)
            }
            FailureStage::Save => self.persist_one(id).await,
        }
    }

    /// Save one record to the store
    ///
    /// Allowed from `Editing`, from `Persisted` (re-save) and after a failed
    /// save. Returns the resulting status: `Persisted` or `Failed`.
    pub async fn persist_one(&self, id: ItemId) -> IntakeResult<ItemStatus> {
        let (old_status, fields) = {
            let mut state = self.lock();
            let item = state.get_mut(id)?;
            let allowed = match item.status {
                ItemStatus::Editing | ItemStatus::Persisted => true,
                ItemStatus::Failed => item.failed_stage == Some(FailureStage::Save),
                _ => false,
            };
            if !allowed {
                return Err(IntakeError::InvalidState {
                    id,
                    status: item.status,
                    operation: "save",
                });
            }

            let old_status = item.status;
            item.clear_failure();
            item.status = ItemStatus::Persisting;
            (old_status, item.fields.clone())
        };

        debug!(item = %id, "Saving record");
        self.emit_status(id, old_status, ItemStatus::Persisting, None);
        self.mark_changed();

        let result = self.shared.backend.persist(&fields).await;

        let new_status = {
            let mut state = self.lock();
            let item = state.get_mut(id)?;
            match result {
                Ok(()) => {
                    item.status = ItemStatus::Persisted;
                    info!(item = %id, "Record saved");
                }
                Err(e) => {
                    warn!(item = %id, error = %e, "Save failed");
                    item.fail(FailureStage::Save);
                }
            }
            item.status
        };

        let error_message =
            (new_status == ItemStatus::Failed).then(|| FailureStage::Save.message().to_string());
        self.emit_status(id, ItemStatus::Persisting, new_status, error_message);
        self.mark_changed();
        self.try_advance();

        Ok(new_status)
    }

    /// Save every `Editing` item, oldest surgery date first
    ///
    /// Saves run one after another; a failed save does not stop the batch.
    /// Items removed or no longer editable when their turn comes are skipped.
    pub async fn persist_all_editing(&self) -> BatchReport {
        let order = {
            let state = self.lock();
            commit_order(
                state
                    .items
                    .iter()
                    .filter(|item| item.status == ItemStatus::Editing)
                    .map(|item| (item.id, &item.fields)),
            )
        };

        info!(count = order.len(), "Saving all editing items");
        self.shared
            .event_bus
            .emit_lossy(IntakeEvent::BatchPersistStarted {
                item_ids: order.clone(),
                timestamp: chrono::Utc::now(),
            });

        let mut report = BatchReport::default();
        for id in order {
            let still_editing = self
                .lock()
                .get(id)
                .map(|item| item.status == ItemStatus::Editing)
                .unwrap_or(false);
            if !still_editing {
                warn!(item = %id, "Item changed before its turn, skipped");
                report.record(id, BatchOutcome::Skipped);
                continue;
            }

            match self.persist_one(id).await {
                Ok(status) => report.record_status(id, status),
                Err(e) => {
                    warn!(item = %id, error = %e, "Item skipped");
                    report.record(id, BatchOutcome::Skipped);
                }
            }
        }

        info!(
            persisted = report.persisted(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Batch save finished"
        );
        self.shared
            .event_bus
            .emit_lossy(IntakeEvent::BatchPersistCompleted {
                persisted: report.persisted(),
                failed: report.failed(),
                timestamp: chrono::Utc::now(),
            });

        report
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Copy of all items in queue order
    pub fn items(&self) -> Vec<IntakeItem> {
        self.lock().items.clone()
    }

    pub fn item(&self, id: ItemId) -> Option<IntakeItem> {
        self.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// A recognition call is outstanding
    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// Items still waiting for or undergoing recognition
    pub fn pending_count(&self) -> usize {
        self.lock()
            .items
            .iter()
            .filter(|item| matches!(item.status, ItemStatus::Queued | ItemStatus::Recognizing))
            .count()
    }

    fn is_drained(&self) -> bool {
        let state = self.lock();
        !state.busy
            && !state
                .items
                .iter()
                .any(|item| matches!(item.status, ItemStatus::Queued | ItemStatus::Recognizing))
    }

    /// Resolve once nothing is queued or being recognized
    pub async fn wait_until_idle(&self) {
        let mut rx = self.shared.revision.subscribe();
        loop {
            if self.is_drained() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
