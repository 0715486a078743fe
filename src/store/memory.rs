//! In-memory store client used by the lifecycle test suite.

use async_trait::async_trait;
use futures::stream::StreamExt;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::store::{is_valid_collection_name, DocumentStream, StoreClient, StoreError};

/// Database -> collection -> documents in insertion order. BTreeMap keeps
/// collection listings stable, matching the ordered Postgres listing.
type Databases = HashMap<String, BTreeMap<String, Vec<Value>>>;

#[derive(Default)]
pub struct MemoryStoreClient {
    databases: RwLock<Databases>,
}

impl MemoryStoreClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the named database currently exists (test helper).
    pub async fn database_exists(&self, db_name: &str) -> bool {
        self.databases.read().await.contains_key(db_name)
    }

    fn check_collection(collection: &str) -> Result<(), StoreError> {
        if is_valid_collection_name(collection) {
            Ok(())
        } else {
            Err(StoreError::InvalidCollectionName(collection.to_string()))
        }
    }
}

#[async_trait]
impl StoreClient for MemoryStoreClient {
    async fn list_collections(&self, db_name: &str) -> Result<Vec<String>, StoreError> {
        let databases = self.databases.read().await;
        Ok(databases
            .get(db_name)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn read_all(&self, db_name: &str, collection: &str) -> Result<DocumentStream, StoreError> {
        Self::check_collection(collection)?;
        let databases = self.databases.read().await;
        let docs: Vec<Value> = databases
            .get(db_name)
            .and_then(|collections| collections.get(collection))
            .cloned()
            .unwrap_or_default();
        Ok(futures::stream::iter(docs.into_iter().map(Ok)).boxed())
    }

    async fn write_one(&self, db_name: &str, collection: &str, doc: Value) -> Result<(), StoreError> {
        Self::check_collection(collection)?;
        let mut databases = self.databases.write().await;
        databases
            .entry(db_name.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .push(doc);
        Ok(())
    }

    async fn delete_all(&self, db_name: &str, collection: &str) -> Result<(), StoreError> {
        Self::check_collection(collection)?;
        let mut databases = self.databases.write().await;
        if let Some(collections) = databases.get_mut(db_name) {
            if let Some(docs) = collections.get_mut(collection) {
                docs.clear();
            }
        }
        Ok(())
    }

    async fn drop_database(&self, db_name: &str) -> Result<(), StoreError> {
        let mut databases = self.databases.write().await;
        databases.remove(db_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn write_creates_database_and_collection_lazily() {
        let store = MemoryStoreClient::new();
        assert!(!store.database_exists("org_acme").await);

        store.write_one("org_acme", "widgets", json!({"n": 1})).await.unwrap();

        assert!(store.database_exists("org_acme").await);
        assert_eq!(store.list_collections("org_acme").await.unwrap(), vec!["widgets"]);
    }

    #[tokio::test]
    async fn read_all_preserves_insertion_order() {
        let store = MemoryStoreClient::new();
        for n in 0..3 {
            store.write_one("org_acme", "widgets", json!({"n": n})).await.unwrap();
        }

        let docs: Vec<_> = store
            .read_all("org_acme", "widgets")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(docs, vec![json!({"n": 0}), json!({"n": 1}), json!({"n": 2})]);
    }

    #[tokio::test]
    async fn drop_database_twice_is_a_no_op() {
        let store = MemoryStoreClient::new();
        store.write_one("org_acme", "widgets", json!({})).await.unwrap();

        store.drop_database("org_acme").await.unwrap();
        store.drop_database("org_acme").await.unwrap();

        assert!(store.list_collections("org_acme").await.unwrap().is_empty());
    }
}
