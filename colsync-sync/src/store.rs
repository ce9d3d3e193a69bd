//! In-memory collection store.
//!
//! Holds the key → item map of one collection and exposes atomic write
//! transactions plus a change feed. A transaction holds the write lock from
//! `begin()` to `commit()`, so readers never observe a half-applied batch.
//! Callers must not await while a transaction is open.

use crate::error::{SyncError, SyncResult};
use colsync_model::{get_key, CollectionSchema, Item, ItemKey, ModelResult};
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// A single write inside a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert or replace the item under its own key.
    Insert(Item),
    /// Replace the item stored under `key`.
    Update { key: ItemKey, value: Item },
    /// Remove the item stored under `key`.
    Delete(ItemKey),
}

/// What a committed write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One observed change, published to subscribers after commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub kind: ChangeKind,
    pub key: ItemKey,
    /// The item after the change; `None` for deletes.
    pub value: Option<Item>,
    /// The item before the change; `None` for fresh inserts.
    pub previous: Option<Item>,
}

/// A batch of changes committed together.
pub type ChangeBatch = Arc<[Change]>;

/// Keyed item storage for one collection.
pub struct CollectionStore {
    schema: Arc<CollectionSchema>,
    items: RwLock<BTreeMap<ItemKey, Item>>,
    changes: broadcast::Sender<ChangeBatch>,
}

impl CollectionStore {
    /// Creates an empty store. `capacity` bounds each change subscriber's backlog.
    pub fn new(schema: Arc<CollectionSchema>, capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            schema,
            items: RwLock::new(BTreeMap::new()),
            changes,
        }
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    /// Derives the canonical key of `item`.
    pub fn get_key(&self, item: &Item) -> ModelResult<ItemKey> {
        get_key(&self.schema, item)
    }

    pub fn get(&self, key: &ItemKey) -> Option<Item> {
        self.items.read().get(key).cloned()
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.items.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// All keys in key order.
    pub fn keys(&self) -> Vec<ItemKey> {
        self.items.read().keys().cloned().collect()
    }

    /// All items in key order.
    pub fn values(&self) -> Vec<Item> {
        self.items.read().values().cloned().collect()
    }

    /// A consistent copy of the whole map.
    pub fn entries(&self) -> BTreeMap<ItemKey, Item> {
        self.items.read().clone()
    }

    /// Subscribes to committed change batches.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeBatch> {
        self.changes.subscribe()
    }

    /// Opens a write transaction.
    pub fn begin(&self) -> StoreTransaction<'_> {
        StoreTransaction {
            store: self,
            items: self.items.write(),
            changes: Vec::new(),
            committed: false,
        }
    }

    /// Inserts items in one transaction. Returns how many were written.
    pub fn insert(&self, items: impl IntoIterator<Item = Item>) -> SyncResult<usize> {
        let mut txn = self.begin();
        let mut written = 0;
        for item in items {
            txn.write(WriteOp::Insert(item))?;
            written += 1;
        }
        txn.commit();
        Ok(written)
    }

    /// Mutates the item under `key` in place. Returns `false` if absent.
    pub fn update(&self, key: &ItemKey, mutate: impl FnOnce(&mut Item)) -> SyncResult<bool> {
        let mut txn = self.begin();
        let updated = txn.update_with(key, mutate)?;
        txn.commit();
        Ok(updated)
    }

    /// Removes the item under `key`, returning it.
    pub fn delete(&self, key: &ItemKey) -> Option<Item> {
        let mut txn = self.begin();
        let removed = txn.remove(key);
        txn.commit();
        removed
    }

    fn publish(&self, changes: Vec<Change>) {
        if changes.is_empty() {
            return;
        }
        debug!("{}: committed {} change(s)", self.schema.name(), changes.len());
        // No subscribers is fine.
        let _ = self.changes.send(changes.into());
    }
}

/// An open write transaction.
///
/// Writes apply immediately under the held lock. Dropping the transaction
/// without calling [`StoreTransaction::commit`] undoes them.
pub struct StoreTransaction<'a> {
    store: &'a CollectionStore,
    items: RwLockWriteGuard<'a, BTreeMap<ItemKey, Item>>,
    changes: Vec<Change>,
    committed: bool,
}

impl StoreTransaction<'_> {
    /// Reads an item, including this transaction's own writes.
    pub fn get(&self, key: &ItemKey) -> Option<&Item> {
        self.items.get(key)
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.items.contains_key(key)
    }

    /// Applies one write. Returns `false` when an update or delete targets
    /// a missing key, in which case nothing changes.
    pub fn write(&mut self, op: WriteOp) -> SyncResult<bool> {
        match op {
            WriteOp::Insert(item) => {
                let key = self.store.get_key(&item)?;
                let previous = self.items.insert(key.clone(), item.clone());
                let kind = if previous.is_some() {
                    ChangeKind::Update
                } else {
                    ChangeKind::Insert
                };
                self.changes.push(Change {
                    kind,
                    key,
                    value: Some(item),
                    previous,
                });
                Ok(true)
            }
            WriteOp::Update { key, value } => {
                if self.store.get_key(&value)? != key {
                    return Err(SyncError::KeyChanged(key.into_string()));
                }
                match self.items.get_mut(&key) {
                    None => Ok(false),
                    Some(slot) => {
                        let previous = std::mem::replace(slot, value.clone());
                        self.changes.push(Change {
                            kind: ChangeKind::Update,
                            key,
                            value: Some(value),
                            previous: Some(previous),
                        });
                        Ok(true)
                    }
                }
            }
            WriteOp::Delete(key) => Ok(self.remove(&key).is_some()),
        }
    }

    /// Mutates the item under `key` through a draft. The draft is discarded
    /// if the closure changes the key fields.
    pub fn update_with(&mut self, key: &ItemKey, mutate: impl FnOnce(&mut Item)) -> SyncResult<bool> {
        let Some(current) = self.items.get(key) else {
            return Ok(false);
        };
        let mut draft = current.clone();
        mutate(&mut draft);
        self.write(WriteOp::Update {
            key: key.clone(),
            value: draft,
        })
    }

    fn remove(&mut self, key: &ItemKey) -> Option<Item> {
        let previous = self.items.remove(key)?;
        self.changes.push(Change {
            kind: ChangeKind::Delete,
            key: key.clone(),
            value: None,
            previous: Some(previous.clone()),
        });
        Some(previous)
    }

    /// Number of writes so far.
    pub fn pending(&self) -> usize {
        self.changes.len()
    }

    /// Commits the transaction, releases the lock and publishes the changes.
    pub fn commit(mut self) -> usize {
        self.committed = true;
        let changes = std::mem::take(&mut self.changes);
        let count = changes.len();
        let store = self.store;
        drop(self);
        store.publish(changes);
        count
    }

    fn rollback(&mut self) {
        for change in self.changes.drain(..).rev() {
            match change.previous {
                Some(previous) => {
                    self.items.insert(change.key, previous);
                }
                None => {
                    self.items.remove(&change.key);
                }
            }
        }
    }
}

impl Drop for StoreTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}
