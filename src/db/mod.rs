pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::{create_pool, PgDocumentStore};
pub use store::{CollectionPath, Document, DocumentStore, Snapshot, Subscription};
