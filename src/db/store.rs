use std::fmt::Display;

use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::AppResult;

/// Slash-separated address of a document collection, e.g. `users/u1/wishlist`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// The private wishlist collection of one identity
    pub fn wishlist(uid: &str) -> Self {
        Self(format!("users/{}/wishlist", uid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CollectionPath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored document: its key within the collection and its JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

/// Full point-in-time listing of a collection, ordered by document key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Live subscription to one collection
///
/// Yields the collection's current snapshot first, then a full snapshot after
/// every change. Snapshots that arrive faster than they are consumed collapse
/// into the latest one. Dropping the handle cancels the subscription.
pub struct Subscription {
    snapshots: watch::Receiver<Snapshot>,
    delivered_initial: bool,
}

impl Subscription {
    pub fn new(snapshots: watch::Receiver<Snapshot>) -> Self {
        Self {
            snapshots,
            delivered_initial: false,
        }
    }

    /// Next snapshot, or `None` once the source has gone away
    pub async fn next(&mut self) -> Option<Snapshot> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Some(self.snapshots.borrow_and_update().clone());
        }

        self.snapshots.changed().await.ok()?;
        Some(self.snapshots.borrow_and_update().clone())
    }
}

/// Document collection store
///
/// Collections are addressed by path and documents by key. Writes are full
/// overwrites; there are no transactions or locks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &CollectionPath, key: &str) -> AppResult<Option<Document>>;

    /// Creates or fully replaces the document at `key`
    async fn set(
        &self,
        collection: &CollectionPath,
        key: &str,
        data: Map<String, Value>,
    ) -> AppResult<()>;

    /// Deletes the document at `key`; succeeds when it does not exist
    async fn delete(&self, collection: &CollectionPath, key: &str) -> AppResult<()>;

    async fn subscribe(&self, collection: &CollectionPath) -> AppResult<Subscription>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn snapshot_of(ids: &[&str]) -> Snapshot {
        Snapshot {
            documents: ids
                .iter()
                .map(|id| Document {
                    id: id.to_string(),
                    data: Map::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_wishlist_path() {
        assert_eq!(CollectionPath::wishlist("u1").as_str(), "users/u1/wishlist");
        assert_eq!(CollectionPath::from("users/u1/wishlist"), CollectionPath::wishlist("u1"));
    }

    #[tokio::test]
    async fn test_subscription_yields_initial_then_waits() {
        let (tx, rx) = watch::channel(snapshot_of(&["1"]));
        let mut subscription = Subscription::new(rx);

        assert_eq!(subscription.next().await, Some(snapshot_of(&["1"])));

        {
            let mut next = task::spawn(subscription.next());
            assert_pending!(next.poll());
        }

        tx.send(snapshot_of(&["1", "2"])).unwrap();
        assert_eq!(subscription.next().await, Some(snapshot_of(&["1", "2"])));
    }

    #[tokio::test]
    async fn test_subscription_collapses_to_latest() {
        let (tx, rx) = watch::channel(Snapshot::default());
        let mut subscription = Subscription::new(rx);
        subscription.next().await;

        tx.send(snapshot_of(&["1"])).unwrap();
        tx.send(snapshot_of(&["1", "2"])).unwrap();

        let mut next = task::spawn(subscription.next());
        assert_ready_eq!(next.poll(), Some(snapshot_of(&["1", "2"])));
    }

    #[tokio::test]
    async fn test_subscription_ends_when_source_dropped() {
        let (tx, rx) = watch::channel(Snapshot::default());
        let mut subscription = Subscription::new(rx);
        subscription.next().await;

        drop(tx);
        assert_eq!(subscription.next().await, None);
    }
}
