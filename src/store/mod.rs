//! Store client boundary: a document database handle offering named
//! collections of opaque JSON documents, one database per organization.
//!
//! The lifecycle manager only ever goes through this trait; it never assumes
//! anything about document shape and copies payloads structure-for-structure.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStoreClient;
pub use postgres::PgStoreClient;

/// Lazy, ordered stream of documents read from one collection.
pub type DocumentStream = BoxStream<'static, Result<Value, StoreError>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] crate::database::DatabaseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Handle to the multi-database document store.
///
/// Databases come into existence lazily on first write and every read-side
/// operation treats an absent database as empty, so dropping twice or listing
/// after a drop is never an error.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Collection names present in `db_name`; empty when the database is
    /// absent.
    async fn list_collections(&self, db_name: &str) -> Result<Vec<String>, StoreError>;

    /// Stream every document of a collection in a stable order.
    async fn read_all(&self, db_name: &str, collection: &str) -> Result<DocumentStream, StoreError>;

    /// Insert one document, creating the database and collection as needed.
    async fn write_one(&self, db_name: &str, collection: &str, doc: Value) -> Result<(), StoreError>;

    /// Remove every document of a collection; no-op when absent.
    async fn delete_all(&self, db_name: &str, collection: &str) -> Result<(), StoreError>;

    /// Drop the whole database; idempotent no-op when absent.
    async fn drop_database(&self, db_name: &str) -> Result<(), StoreError>;
}

/// Collection names end up as SQL identifiers in the Postgres backend, so
/// every implementation enforces the same shape.
pub fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
