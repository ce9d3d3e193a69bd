//! Optimistic mutations.
//!
//! Each operation is a pair: `on_mutate` writes the guessed result into the
//! store right away, `mutation_fn` sends the RPC and then waits until a
//! stream frame applied after the call started has advanced the watermark.
//! A rejected RPC is reported to the caller; the local write stays.

use crate::collection::{aborted, CollectionShared};
use crate::error::{SyncError, SyncResult};
use colsync_model::{
    get_key, merge_into, parse_key, Item, ItemKey, MethodDescriptor, MutationRequest,
    TYPE_NAME_FIELD,
};
use colsync_types::SyncTimestamp;
use serde_json::Value;
use std::fmt;
use tokio::sync::watch;
use tracing::{debug, warn};

/// The three mutation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl CollectionShared {
    pub(crate) fn mutation_method(&self, kind: MutationKind) -> SyncResult<&MethodDescriptor> {
        let ops = &self.schema.operations;
        let method = match kind {
            MutationKind::Insert => ops.insert.as_ref(),
            MutationKind::Update => ops.update.as_ref(),
            MutationKind::Delete => ops.delete.as_ref(),
        };
        method.ok_or_else(|| SyncError::UnsupportedOperation {
            collection: self.name().to_string(),
            operation: kind,
        })
    }

    /// Checks mutation input against the schema. Inserts must be full items;
    /// updates are deltas; deletes only need the key fields.
    pub(crate) fn validate_input(&self, kind: MutationKind, mut input: Item) -> SyncResult<Item> {
        if kind == MutationKind::Insert {
            return Ok(self.schema.validate_item(Value::Object(input))?);
        }
        // Partial inputs may be tagged with the item type instead of the
        // stream message type.
        let tagged_as_item = input
            .get(TYPE_NAME_FIELD)
            .and_then(Value::as_str)
            .is_some_and(|name| name == self.name());
        let tag = if tagged_as_item {
            input.remove(TYPE_NAME_FIELD)
        } else {
            None
        };

        let mut checked = match kind {
            MutationKind::Update => self.schema.validate_delta(Value::Object(input))?,
            _ => self.schema.validate_key_fields(Value::Object(input))?,
        };
        if let Some(tag) = tag {
            checked.insert(TYPE_NAME_FIELD.to_string(), tag);
        }
        Ok(checked)
    }

    /// Writes the expected outcome of a mutation into the store.
    pub(crate) fn on_mutate(&self, kind: MutationKind, input: &Item) -> SyncResult<()> {
        match kind {
            MutationKind::Insert => {
                self.store.insert([input.clone()])?;
            }
            MutationKind::Update => {
                let key = get_key(&self.schema, input)?;
                let schema = &self.schema;
                let found = self.store.update(&key, |draft| {
                    merge_into(&schema.item, draft, input, &schema.unset)
                })?;
                if !found {
                    warn!("{}: optimistic update for missing key {key}, skipping", self.name());
                }
            }
            MutationKind::Delete => {
                let key = get_key(&self.schema, input)?;
                if self.store.delete(&key).is_none() {
                    warn!("{}: optimistic delete for missing key {key}, skipping", self.name());
                }
            }
        }
        Ok(())
    }

    /// Sends the mutation RPC and waits for the stream to catch up.
    pub(crate) async fn mutation_fn(&self, kind: MutationKind, input: Item) -> SyncResult<()> {
        let method = self.mutation_method(kind)?;
        let started = self.clock.tick();
        let request = MutationRequest::single(input).to_value()?;

        debug!("{}: sending {kind} via {method}", self.name());
        self.transport.unary(method, request).await?;
        self.wait_for_sync(started).await
    }

    /// Resolves once a frame applied after `since` has advanced the
    /// watermark. Fails with `Timeout` after the configured limit and with
    /// `Disposed` if the collection is disposed first.
    pub(crate) async fn wait_for_sync(&self, since: SyncTimestamp) -> SyncResult<()> {
        if self.watermark.borrow().is_after(&since) {
            return Ok(());
        }

        let watermark = self.watermark.subscribe();
        let mut abort = self.abort.subscribe();
        let wait = async move {
            tokio::select! {
                biased;
                passed = watermark_passes(watermark, since) => passed,
                _ = aborted(&mut abort) => Err(SyncError::Disposed),
            }
        };

        match self.config.wait_for_sync_timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| SyncError::Timeout)?,
            None => wait.await,
        }
    }
}

async fn watermark_passes(
    mut watermark: watch::Receiver<SyncTimestamp>,
    since: SyncTimestamp,
) -> SyncResult<()> {
    watermark
        .wait_for(|at| at.is_after(&since))
        .await
        .map(|_| ())
        .map_err(|_| SyncError::ChannelClosed)
}

/// Mutation and key helpers of one collection, from [`crate::Collection::utils`].
pub struct CollectionUtils<'a> {
    shared: &'a CollectionShared,
}

impl<'a> CollectionUtils<'a> {
    pub(crate) fn new(shared: &'a CollectionShared) -> Self {
        Self { shared }
    }

    /// Inserts `item` locally, then on the server.
    pub async fn insert(&self, item: Item) -> SyncResult<()> {
        self.run(MutationKind::Insert, item).await
    }

    /// Merges `delta` into the stored item locally, then on the server.
    pub async fn update(&self, delta: Item) -> SyncResult<()> {
        self.run(MutationKind::Update, delta).await
    }

    /// Removes the item identified by `keys` locally, then on the server.
    pub async fn delete(&self, keys: Item) -> SyncResult<()> {
        self.run(MutationKind::Delete, keys).await
    }

    async fn run(&self, kind: MutationKind, input: Item) -> SyncResult<()> {
        self.shared.mutation_method(kind)?;
        let input = self.shared.validate_input(kind, input)?;
        self.shared.on_mutate(kind, &input)?;
        self.shared.mutation_fn(kind, input).await
    }

    /// The local half of a mutation, without validation or RPC.
    pub fn on_mutate(&self, kind: MutationKind, input: &Item) -> SyncResult<()> {
        self.shared.on_mutate(kind, input)
    }

    /// The remote half of a mutation.
    pub async fn mutation_fn(&self, kind: MutationKind, input: Item) -> SyncResult<()> {
        self.shared.mutation_fn(kind, input).await
    }

    pub async fn wait_for_sync(&self, since: SyncTimestamp) -> SyncResult<()> {
        self.shared.wait_for_sync(since).await
    }

    /// Current time on the collection's sync clock.
    pub fn now(&self) -> SyncTimestamp {
        self.shared.clock.tick()
    }

    pub fn get_key(&self, item: &Item) -> SyncResult<ItemKey> {
        Ok(get_key(&self.shared.schema, item)?)
    }

    pub fn parse_key(&self, key: &ItemKey) -> SyncResult<Item> {
        Ok(parse_key(&self.shared.schema, key)?)
    }
}
