//! Batch save ordering and reporting

use oplog_common::events::{ItemId, ItemStatus};
use oplog_common::time::record_date_sort_key;
use oplog_common::RecordFields;

/// Result of saving one item during a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Persisted,
    Failed,
    /// Removed or no longer editable by the time its turn came
    Skipped,
}

/// Per-item outcomes of a batch save, in commit order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub entries: Vec<(ItemId, BatchOutcome)>,
}

impl BatchReport {
    pub(crate) fn record(&mut self, id: ItemId, outcome: BatchOutcome) {
        self.entries.push((id, outcome));
    }

    pub(crate) fn record_status(&mut self, id: ItemId, status: ItemStatus) {
        let outcome = match status {
            ItemStatus::Persisted => BatchOutcome::Persisted,
            _ => BatchOutcome::Failed,
        };
        self.record(id, outcome);
    }

    /// Ids in the order they were committed
    pub fn order(&self) -> Vec<ItemId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn persisted(&self) -> usize {
        self.count(BatchOutcome::Persisted)
    }

    pub fn failed(&self) -> usize {
        self.count(BatchOutcome::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(BatchOutcome::Skipped)
    }

    fn count(&self, outcome: BatchOutcome) -> usize {
        self.entries.iter().filter(|(_, o)| *o == outcome).count()
    }
}

/// Order records for commit: ascending by surgery date
///
/// Input is in queue order. The sort is stable, so equal dates keep queue
/// order; missing or unparseable dates sort last.
pub fn commit_order<'a, I>(records: I) -> Vec<ItemId>
where
    I: IntoIterator<Item = (ItemId, &'a RecordFields)>,
{
    let mut keyed: Vec<_> = records
        .into_iter()
        .map(|(id, fields)| (record_date_sort_key(fields.date()), id))
        .collect();
    keyed.sort_by_key(|(date, _)| *date);
    keyed.into_iter().map(|(_, id)| id).collect()
}
