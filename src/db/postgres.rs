use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use sqlx::{
    postgres::{PgListener, PgPoolOptions},
    types::Json,
    PgPool,
};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::AppResult;

use super::store::{CollectionPath, Document, DocumentStore, Snapshot, Subscription};

/// Channel the `documents` trigger notifies on, with the collection path as payload
pub const CHANGE_CHANNEL: &str = "document_changes";

/// Creates a PostgreSQL connection pool and applies the document schema
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Live collections keyed by path; each sender feeds every subscription to it
type Watchers = Arc<Mutex<HashMap<CollectionPath, Arc<watch::Sender<Snapshot>>>>>;

/// Document store on a single PostgreSQL table
///
/// One `LISTEN` connection per store, opened outside the query pool, fans
/// change notifications out to the subscribed collections. A notified
/// collection is re-read in full and published to its subscribers.
pub struct PgDocumentStore {
    pool: PgPool,
    watchers: Watchers,
    dispatcher: JoinHandle<()>,
}

impl PgDocumentStore {
    /// Opens the change listener on its own connection to `database_url`
    pub async fn connect(pool: PgPool, database_url: &str) -> AppResult<Self> {
        let mut listener = PgListener::connect(database_url).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        let watchers = Watchers::default();
        let dispatcher = tokio::spawn(Self::dispatch(pool.clone(), watchers.clone(), listener));

        Ok(Self {
            pool,
            watchers,
            dispatcher,
        })
    }

    async fn load(pool: &PgPool, collection: &CollectionPath) -> AppResult<Snapshot> {
        let rows: Vec<(String, Json<Map<String, Value>>)> = sqlx::query_as(
            "SELECT id, data FROM documents WHERE collection = $1 ORDER BY id",
        )
        .bind(collection.as_str())
        .fetch_all(pool)
        .await?;

        Ok(Snapshot {
            documents: rows
                .into_iter()
                .map(|(id, Json(data))| Document { id, data })
                .collect(),
        })
    }

    async fn dispatch(pool: PgPool, watchers: Watchers, mut listener: PgListener) {
        loop {
            let notification = match listener.recv().await {
                Ok(notification) => notification,
                Err(e) => {
                    tracing::error!(error = %e, "Change listener failed");
                    break;
                }
            };

            let collection = CollectionPath::from(notification.payload());
            let sender = {
                let mut watchers = watchers.lock().await;
                let live = watchers
                    .get(&collection)
                    .map(|sender| (sender.receiver_count() > 0, sender.clone()));
                match live {
                    Some((true, sender)) => Some(sender),
                    Some((false, _)) => {
                        watchers.remove(&collection);
                        None
                    }
                    None => None,
                }
            };
            let Some(sender) = sender else {
                continue;
            };

            match Self::load(&pool, &collection).await {
                Ok(snapshot) => {
                    sender.send_replace(snapshot);
                }
                Err(e) => {
                    tracing::warn!(error = %e, collection = %collection, "Snapshot reload failed");
                }
            }
        }
    }

    /// Number of collections with a live subscription channel
    pub async fn watched_collections(&self) -> usize {
        self.watchers.lock().await.len()
    }
}

impl Drop for PgDocumentStore {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

#[async_trait::async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &CollectionPath, key: &str) -> AppResult<Option<Document>> {
        let row: Option<(String, Json<Map<String, Value>>)> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection.as_str())
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, Json(data))| Document { id, data }))
    }

    async fn set(
        &self,
        collection: &CollectionPath,
        key: &str,
        data: Map<String, Value>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = now()
            "#,
        )
        .bind(collection.as_str())
        .bind(key)
        .bind(Json(data))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, collection: &CollectionPath, key: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn subscribe(&self, collection: &CollectionPath) -> AppResult<Subscription> {
        // The listener is already running; reading under the lock means a
        // change committed after this read is dispatched to the new sender
        let mut watchers = self.watchers.lock().await;
        watchers.retain(|_, sender| sender.receiver_count() > 0);

        if let Some(sender) = watchers.get(collection) {
            if sender.receiver_count() > 0 {
                return Ok(Subscription::new(sender.subscribe()));
            }
        }

        let initial = Self::load(&self.pool, collection).await?;
        let (sender, receiver) = watch::channel(initial);
        watchers.insert(collection.clone(), Arc::new(sender));

        tracing::debug!(collection = %collection, "Collection subscription started");
        Ok(Subscription::new(receiver))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
