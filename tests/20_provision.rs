//! Provisioning and lookup behavior of the organization lifecycle service,
//! exercised over the in-memory catalog and store backends.

use std::sync::Arc;

use org_api_rust::catalog::{Catalog, MemoryCatalog};
use org_api_rust::services::{LifecycleError, OrgService};
use org_api_rust::store::MemoryStoreClient;

fn setup() -> (Arc<MemoryCatalog>, Arc<MemoryStoreClient>, OrgService) {
    let catalog = Arc::new(MemoryCatalog::new());
    let store = Arc::new(MemoryStoreClient::new());
    let service = OrgService::new(catalog.clone(), store.clone());
    (catalog, store, service)
}

#[tokio::test]
async fn provision_then_get_derives_database_name() {
    let (_, store, service) = setup();

    let org = service.provision(" Acme ", "a@x.com", "hash").await.unwrap();
    assert_eq!(org.name, "acme");
    assert_eq!(org.database_name, "org_acme");

    // Lookup is normalized the same way as creation
    let found = service.get_by_name("ACME").await.unwrap();
    assert_eq!(found.id, org.id);
    assert_eq!(found.database_name, "org_acme");

    // The physical store came into existence before any catalog write
    assert!(store.database_exists("org_acme").await);
}

#[tokio::test]
async fn provision_binds_admin_to_organization() {
    let (catalog, _, service) = setup();

    let org = service.provision("acme", "a@x.com", "hash").await.unwrap();

    let admin = catalog.find_admin_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(admin.id, org.admin_id);
    assert_eq!(admin.organization_name, "acme");
    assert_eq!(admin.hashed_password, "hash");
}

#[tokio::test]
async fn provision_rejects_name_collisions_regardless_of_casing() {
    let (_, _, service) = setup();

    service.provision("Acme", "a@x.com", "hash").await.unwrap();

    let err = service.provision(" acme ", "b@x.com", "hash").await.unwrap_err();
    assert!(matches!(err, LifecycleError::NameTaken(ref name) if name == "acme"));
}

#[tokio::test]
async fn provision_rejects_duplicate_admin_emails() {
    let (_, _, service) = setup();

    service.provision("acme", "a@x.com", "hash").await.unwrap();

    let err = service.provision("beta", "a@x.com", "hash").await.unwrap_err();
    assert!(matches!(err, LifecycleError::EmailTaken(ref email) if email == "a@x.com"));
}

#[tokio::test]
async fn provision_rejects_malformed_names() {
    let (_, store, service) = setup();

    let too_long = "x".repeat(51);
    for bad in ["ab", "acme-inc", "acme co", too_long.as_str()] {
        let err = service.provision(bad, "a@x.com", "hash").await.unwrap_err();
        assert!(
            matches!(err, LifecycleError::InvalidInput(_)),
            "expected InvalidInput for {:?}",
            bad
        );
    }

    // Nothing was created along the way
    assert!(!store.database_exists("org_ab").await);
}

#[tokio::test]
async fn get_by_name_reports_missing_organizations() {
    let (_, _, service) = setup();

    let err = service.get_by_name("ghost").await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(ref name) if name == "ghost"));
}

#[tokio::test]
async fn create_admin_requires_existing_organization() {
    let (_, _, service) = setup();

    let err = service.create_admin("a@x.com", "hash", "ghost").await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));
}

#[tokio::test]
async fn create_admin_binds_to_normalized_organization_name() {
    let (catalog, _, service) = setup();

    service.provision("acme", "a@x.com", "hash").await.unwrap();
    let admin = service.create_admin("b@x.com", "hash", " ACME ").await.unwrap();
    assert_eq!(admin.organization_name, "acme");

    let err = service.create_admin("b@x.com", "hash", "acme").await.unwrap_err();
    assert!(matches!(err, LifecycleError::EmailTaken(_)));

    // Both admins resolve independently
    assert!(catalog.find_admin_by_email("a@x.com").await.unwrap().is_some());
    assert!(catalog.find_admin_by_email("b@x.com").await.unwrap().is_some());
}
