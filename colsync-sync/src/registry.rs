//! One collection per schema for a transport.

use crate::collection::{create_collection, Collection};
use crate::config::CollectionConfig;
use crate::error::SyncResult;
use crate::state::CollectionStatus;
use crate::transport::Transport;
use colsync_model::CollectionSchema;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Memoizes collections by schema type name so every caller asking for the
/// same entity shares one store and one stream.
pub struct CollectionRegistry {
    transport: Arc<dyn Transport>,
    config: CollectionConfig,
    collections: Mutex<HashMap<String, Collection>>,
}

impl CollectionRegistry {
    pub fn new(transport: Arc<dyn Transport>, config: CollectionConfig) -> Self {
        Self {
            transport,
            config,
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the live collection for `schema`, creating it on first use
    /// or after the previous one was disposed or failed its initial sync.
    pub fn get_or_create(&self, schema: Arc<CollectionSchema>) -> SyncResult<Collection> {
        let mut collections = self.collections.lock();
        if let Some(existing) = collections.get(schema.name()) {
            match existing.status() {
                CollectionStatus::Loading | CollectionStatus::Ready => {
                    return Ok(existing.clone());
                }
                CollectionStatus::Failed => {
                    debug!("{}: replacing failed collection", schema.name());
                    existing.dispose();
                }
                CollectionStatus::Disposed => {
                    debug!("{}: replacing disposed collection", schema.name());
                }
            }
        }

        let name = schema.name().to_string();
        let collection = create_collection(schema, self.transport.clone(), self.config.clone())?;
        collections.insert(name, collection.clone());
        Ok(collection)
    }

    pub fn get(&self, name: &str) -> Option<Collection> {
        self.collections.lock().get(name).cloned()
    }

    /// Disposes and forgets the collection named `name`.
    pub fn dispose(&self, name: &str) -> bool {
        let removed = self.collections.lock().remove(name);
        match removed {
            Some(collection) => {
                collection.dispose();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.collections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.lock().is_empty()
    }
}
