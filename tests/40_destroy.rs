//! Destroy workflow: store first, metadata second, idempotent drops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use org_api_rust::catalog::{Catalog, MemoryCatalog};
use org_api_rust::services::{LifecycleError, OrgService};
use org_api_rust::store::{DocumentStream, MemoryStoreClient, StoreClient, StoreError};

fn setup() -> (Arc<MemoryCatalog>, Arc<MemoryStoreClient>, OrgService) {
    let catalog = Arc::new(MemoryCatalog::new());
    let store = Arc::new(MemoryStoreClient::new());
    let service = OrgService::new(catalog.clone(), store.clone());
    (catalog, store, service)
}

#[tokio::test]
async fn destroy_reports_missing_organizations() {
    let (_, _, service) = setup();

    let err = service.destroy("ghost", "ghost").await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));
}

#[tokio::test]
async fn destroy_requires_matching_caller_organization() {
    let (_, _, service) = setup();

    service.provision("acme", "a@x.com", "hash").await.unwrap();

    let err = service.destroy("beta", "acme").await.unwrap_err();
    assert!(matches!(err, LifecycleError::Forbidden(_)));

    // Nothing was touched
    assert!(service.get_by_name("acme").await.is_ok());
}

#[tokio::test]
async fn destroy_removes_store_admins_and_metadata() {
    let (catalog, store, service) = setup();

    service.provision("acme", "a@x.com", "hash").await.unwrap();
    service.create_admin("b@x.com", "hash", "acme").await.unwrap();
    store.write_one("org_acme", "widgets", json!({"sku": "w-1"})).await.unwrap();

    service.destroy("acme", " ACME ").await.unwrap();

    let err = service.get_by_name("acme").await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));

    assert!(catalog.find_admin_by_email("a@x.com").await.unwrap().is_none());
    assert!(catalog.find_admin_by_email("b@x.com").await.unwrap().is_none());

    assert!(!store.database_exists("org_acme").await);
    assert!(store.list_collections("org_acme").await.unwrap().is_empty());
}

#[tokio::test]
async fn destroyed_store_can_be_dropped_again_without_error() {
    let (_, store, service) = setup();

    service.provision("acme", "a@x.com", "hash").await.unwrap();
    service.destroy("acme", "acme").await.unwrap();

    // The drop step is idempotent against an already-absent store
    store.drop_database("org_acme").await.unwrap();

    // A repeated destroy fails the precondition, not the drop
    let err = service.destroy("acme", "acme").await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));
}

/// Store wrapper whose database drop can be made to fail.
struct FailingDropStore {
    inner: MemoryStoreClient,
    fail_drops: AtomicBool,
}

#[async_trait]
impl StoreClient for FailingDropStore {
    async fn list_collections(&self, db_name: &str) -> Result<Vec<String>, StoreError> {
        self.inner.list_collections(db_name).await
    }

    async fn read_all(&self, db_name: &str, collection: &str) -> Result<DocumentStream, StoreError> {
        self.inner.read_all(db_name, collection).await
    }

    async fn write_one(&self, db_name: &str, collection: &str, doc: Value) -> Result<(), StoreError> {
        self.inner.write_one(db_name, collection, doc).await
    }

    async fn delete_all(&self, db_name: &str, collection: &str) -> Result<(), StoreError> {
        self.inner.delete_all(db_name, collection).await
    }

    async fn drop_database(&self, db_name: &str) -> Result<(), StoreError> {
        if self.fail_drops.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected drop failure".to_string()));
        }
        self.inner.drop_database(db_name).await
    }
}

#[tokio::test]
async fn failed_store_drop_aborts_before_metadata_deletion() {
    let catalog = Arc::new(MemoryCatalog::new());
    let store = Arc::new(FailingDropStore {
        inner: MemoryStoreClient::new(),
        fail_drops: AtomicBool::new(false),
    });
    let service = OrgService::new(catalog.clone(), store.clone());

    service.provision("acme", "a@x.com", "hash").await.unwrap();

    store.fail_drops.store(true, Ordering::SeqCst);
    let err = service.destroy("acme", "acme").await.unwrap_err();
    assert!(matches!(err, LifecycleError::StoreUnavailable(_)));

    // Metadata survives; destroy can be rerun once the store recovers
    assert!(service.get_by_name("acme").await.is_ok());
    assert!(catalog.find_admin_by_email("a@x.com").await.unwrap().is_some());

    store.fail_drops.store(false, Ordering::SeqCst);
    service.destroy("acme", "acme").await.unwrap();
    assert!(service.get_by_name("acme").await.is_err());
}
