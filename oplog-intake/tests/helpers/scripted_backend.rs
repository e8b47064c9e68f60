//! Scripted in-process backend
//!
//! Records every call and tracks how many recognitions overlap.

use async_trait::async_trait;
use oplog_common::RecordFields;
use oplog_intake::{BackendError, ImagePayload, IntakeBackend};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct ScriptedBackend {
    recognize_delay: Duration,
    persist_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    scan_calls: Mutex<Vec<String>>,
    scan_failures: Mutex<HashMap<String, usize>>,
    records: Mutex<HashMap<String, RecordFields>>,
    persist_calls: Mutex<Vec<RecordFields>>,
    persist_failures: Mutex<usize>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recognition takes this long
    pub fn with_delay(delay_ms: u64) -> Self {
        Self {
            recognize_delay: Duration::from_millis(delay_ms),
            ..Self::default()
        }
    }

    /// Every persist call takes this long
    pub fn with_persist_delay(mut self, delay_ms: u64) -> Self {
        self.persist_delay = Duration::from_millis(delay_ms);
        self
    }

    /// Record returned for `file`; default is `{"id": file}`
    pub fn set_record(&self, file: &str, fields: RecordFields) {
        self.records.lock().unwrap().insert(file.to_string(), fields);
    }

    /// Next `count` recognitions of `file` fail with HTTP 500
    pub fn fail_scans(&self, file: &str, count: usize) {
        self.scan_failures
            .lock()
            .unwrap()
            .insert(file.to_string(), count);
    }

    /// Next `count` persist calls fail with HTTP 500
    pub fn fail_next_persists(&self, count: usize) {
        *self.persist_failures.lock().unwrap() = count;
    }

    /// File names passed to recognize, in call order
    pub fn scan_calls(&self) -> Vec<String> {
        self.scan_calls.lock().unwrap().clone()
    }

    /// Records passed to persist, in call order
    pub fn persist_calls(&self) -> Vec<RecordFields> {
        self.persist_calls.lock().unwrap().clone()
    }

    pub fn max_concurrent_scans(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntakeBackend for ScriptedBackend {
    async fn recognize(&self, image: &ImagePayload) -> Result<RecordFields, BackendError> {
        let name = image.file_name.clone();
        self.scan_calls.lock().unwrap().push(name.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.recognize_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        {
            let mut failures = self.scan_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&name) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(BackendError::Status(500));
                }
            }
        }

        let record = self.records.lock().unwrap().get(&name).cloned();
        Ok(record.unwrap_or_else(|| [("id", name.as_str())].into_iter().collect()))
    }

    async fn persist(&self, fields: &RecordFields) -> Result<(), BackendError> {
        self.persist_calls.lock().unwrap().push(fields.clone());
        tokio::time::sleep(self.persist_delay).await;

        let mut failures = self.persist_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(BackendError::Status(500));
        }
        Ok(())
    }
}
