use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use tokio::sync::{watch, RwLock};

use crate::error::AppResult;

use super::store::{CollectionPath, Document, DocumentStore, Snapshot, Subscription};

/// One collection: documents ordered by key, plus the channel feeding subscribers
struct Collection {
    documents: BTreeMap<String, Map<String, Value>>,
    snapshots: watch::Sender<Snapshot>,
}

impl Collection {
    fn new() -> Self {
        let (snapshots, _) = watch::channel(Snapshot::default());
        Self {
            documents: BTreeMap::new(),
            snapshots,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            documents: self
                .documents
                .iter()
                .map(|(id, data)| Document {
                    id: id.clone(),
                    data: data.clone(),
                })
                .collect(),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

/// Process-local document store
///
/// Used for local development and tests. Every write publishes a full snapshot
/// to the collection's subscribers.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<CollectionPath, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &CollectionPath, key: &str) -> AppResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.documents.get(key))
            .map(|data| Document {
                id: key.to_string(),
                data: data.clone(),
            }))
    }

    async fn set(
        &self,
        collection: &CollectionPath,
        key: &str,
        data: Map<String, Value>,
    ) -> AppResult<()> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .entry(collection.clone())
            .or_insert_with(Collection::new);
        entry.documents.insert(key.to_string(), data);
        entry.publish();

        tracing::debug!(collection = %collection, key = %key, "Document written");
        Ok(())
    }

    async fn delete(&self, collection: &CollectionPath, key: &str) -> AppResult<()> {
        let mut collections = self.collections.write().await;
        if let Some(entry) = collections.get_mut(collection) {
            if entry.documents.remove(key).is_some() {
                entry.publish();
                tracing::debug!(collection = %collection, key = %key, "Document deleted");
            }
        }
        Ok(())
    }

    async fn subscribe(&self, collection: &CollectionPath) -> AppResult<Subscription> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .entry(collection.clone())
            .or_insert_with(Collection::new);

        Ok(Subscription::new(entry.snapshots.subscribe()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
