//! Frame applicator - applies snapshots and stream frames to the store.
//!
//! Each frame is applied inside one store transaction, envelopes in array
//! order. Updates are rebuilt from the stored item with the delta merge.
//! Updates and deletes for keys the store does not hold are logged and
//! skipped.

use crate::error::SyncResult;
use crate::store::{CollectionStore, StoreTransaction, WriteOp};
use colsync_model::{get_key, merge, CollectionSchema, Item, ItemKey, SyncEnvelope, SyncFrame};
use tracing::{debug, error, warn};

/// Counts of what one apply call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Envelopes that referenced a missing key or could not be keyed.
    pub skipped: usize,
}

impl ApplyReport {
    /// Envelopes that changed the store.
    pub fn applied(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// Outcome of a single envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Inserted,
    Updated,
    Deleted,
    Skipped,
}

/// Applies sync envelopes to a [`CollectionStore`].
pub struct FrameApplicator<'a> {
    schema: &'a CollectionSchema,
}

impl<'a> FrameApplicator<'a> {
    pub fn new(schema: &'a CollectionSchema) -> Self {
        Self { schema }
    }

    /// Writes every snapshot item in one transaction.
    pub fn apply_snapshot(&self, items: Vec<Item>, store: &CollectionStore) -> SyncResult<ApplyReport> {
        let mut txn = store.begin();
        let mut report = ApplyReport::default();
        for item in items {
            txn.write(WriteOp::Insert(item))?;
            report.inserted += 1;
        }
        txn.commit();
        debug!("{}: applied snapshot of {} item(s)", self.schema.name(), report.inserted);
        Ok(report)
    }

    /// Applies all envelopes of `frame` in one transaction.
    pub fn apply_frame(&self, frame: &SyncFrame, store: &CollectionStore) -> ApplyReport {
        let mut txn = store.begin();
        let mut report = ApplyReport::default();
        for envelope in &frame.items {
            match self.apply_envelope(envelope, &mut txn) {
                Applied::Inserted => report.inserted += 1,
                Applied::Updated => report.updated += 1,
                Applied::Deleted => report.deleted += 1,
                Applied::Skipped => report.skipped += 1,
            }
        }
        txn.commit();
        report
    }

    fn apply_envelope(&self, envelope: &SyncEnvelope, txn: &mut StoreTransaction<'_>) -> Applied {
        let result = match envelope {
            SyncEnvelope::Insert(item) => self.apply_insert(item, txn),
            SyncEnvelope::Update(delta) => self.apply_update(delta, txn),
            SyncEnvelope::Delete(keys) => self.apply_delete(keys, txn),
        };
        result.unwrap_or_else(|e| {
            error!("{}: failed to apply {:?}: {e}", self.schema.name(), envelope.kind());
            Applied::Skipped
        })
    }

    fn apply_insert(&self, item: &Item, txn: &mut StoreTransaction<'_>) -> SyncResult<Applied> {
        txn.write(WriteOp::Insert(item.clone()))?;
        Ok(Applied::Inserted)
    }

    fn apply_update(&self, delta: &Item, txn: &mut StoreTransaction<'_>) -> SyncResult<Applied> {
        let key = self.schema_key(delta)?;
        let Some(current) = txn.get(&key) else {
            error!("{}: update for missing key {key}, skipping", self.schema.name());
            return Ok(Applied::Skipped);
        };
        let value = merge(&self.schema.item, current, delta, &self.schema.unset);
        txn.write(WriteOp::Update { key, value })?;
        Ok(Applied::Updated)
    }

    fn apply_delete(&self, keys: &Item, txn: &mut StoreTransaction<'_>) -> SyncResult<Applied> {
        let key = self.schema_key(keys)?;
        if txn.write(WriteOp::Delete(key.clone()))? {
            Ok(Applied::Deleted)
        } else {
            warn!("{}: delete for missing key {key}, skipping", self.schema.name());
            Ok(Applied::Skipped)
        }
    }

    fn schema_key(&self, item: &Item) -> SyncResult<ItemKey> {
        Ok(get_key(self.schema, item)?)
    }
}
