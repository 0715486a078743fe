//! In-memory catalog used by the lifecycle test suite.
//!
//! Same contract as the Postgres catalog, including duplicate-key rejection,
//! so the lifecycle manager behaves identically over either backend.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::catalog::{Admin, Catalog, CatalogError, NewAdmin, NewOrganization, Organization};

#[derive(Default)]
struct Inner {
    /// Keyed by current organization name.
    orgs: HashMap<String, Organization>,
    /// Keyed by admin email.
    admins: HashMap<String, Admin>,
}

#[derive(Default)]
pub struct MemoryCatalog {
    inner: RwLock<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_org_by_name(&self, name: &str) -> Result<Option<Organization>, CatalogError> {
        let inner = self.inner.read().await;
        Ok(inner.orgs.get(name).cloned())
    }

    async fn insert_org(&self, new: NewOrganization) -> Result<Organization, CatalogError> {
        let mut inner = self.inner.write().await;
        if inner.orgs.contains_key(&new.name) {
            return Err(CatalogError::DuplicateKey {
                field: "name",
                value: new.name,
            });
        }
        let now = Utc::now();
        let org = Organization {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            database_name: new.database_name,
            admin_id: new.admin_id,
            created_at: now,
            updated_at: now,
        };
        inner.orgs.insert(new.name, org.clone());
        Ok(org)
    }

    async fn update_org_name_and_db(
        &self,
        old_name: &str,
        new_name: &str,
        new_db_name: &str,
    ) -> Result<bool, CatalogError> {
        let mut inner = self.inner.write().await;
        if old_name != new_name && inner.orgs.contains_key(new_name) {
            return Err(CatalogError::DuplicateKey {
                field: "name",
                value: new_name.to_string(),
            });
        }
        match inner.orgs.remove(old_name) {
            Some(mut org) => {
                org.name = new_name.to_string();
                org.database_name = new_db_name.to_string();
                org.updated_at = Utc::now();
                inner.orgs.insert(new_name.to_string(), org);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_org(&self, name: &str) -> Result<(), CatalogError> {
        let mut inner = self.inner.write().await;
        inner.orgs.remove(name);
        Ok(())
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, CatalogError> {
        let inner = self.inner.read().await;
        Ok(inner.admins.get(email).cloned())
    }

    async fn insert_admin(&self, new: NewAdmin) -> Result<Admin, CatalogError> {
        let mut inner = self.inner.write().await;
        if inner.admins.contains_key(&new.email) {
            return Err(CatalogError::DuplicateKey {
                field: "email",
                value: new.email,
            });
        }
        let admin = Admin {
            id: Uuid::new_v4(),
            email: new.email.clone(),
            hashed_password: new.hashed_password,
            organization_name: new.organization_name,
            created_at: Utc::now(),
        };
        inner.admins.insert(new.email, admin.clone());
        Ok(admin)
    }

    async fn update_admins_org_name(&self, old_name: &str, new_name: &str) -> Result<u64, CatalogError> {
        let mut inner = self.inner.write().await;
        let mut changed = 0;
        for admin in inner.admins.values_mut() {
            if admin.organization_name == old_name {
                admin.organization_name = new_name.to_string();
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_admins_for_org(&self, name: &str) -> Result<u64, CatalogError> {
        let mut inner = self.inner.write().await;
        let before = inner.admins.len();
        inner.admins.retain(|_, admin| admin.organization_name != name);
        Ok((before - inner.admins.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_duplicate_org_names() {
        let catalog = MemoryCatalog::new();
        let admin_id = Uuid::new_v4();
        catalog
            .insert_org(NewOrganization {
                name: "acme".into(),
                database_name: "org_acme".into(),
                admin_id,
            })
            .await
            .unwrap();

        let err = catalog
            .insert_org(NewOrganization {
                name: "acme".into(),
                database_name: "org_acme".into(),
                admin_id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::DuplicateKey { field: "name", .. }));
    }

    #[tokio::test]
    async fn repoint_misses_when_old_name_gone() {
        let catalog = MemoryCatalog::new();
        let matched = catalog.update_org_name_and_db("ghost", "acme", "org_acme").await.unwrap();
        assert!(!matched);
    }

    #[tokio::test]
    async fn admin_rebind_only_touches_matching_records() {
        let catalog = MemoryCatalog::new();
        for (email, org) in [("a@x.com", "acme"), ("b@x.com", "acme"), ("c@y.com", "other")] {
            catalog
                .insert_admin(NewAdmin {
                    email: email.into(),
                    hashed_password: "hash".into(),
                    organization_name: org.into(),
                })
                .await
                .unwrap();
        }

        let changed = catalog.update_admins_org_name("acme", "acme2").await.unwrap();
        assert_eq!(changed, 2);

        let untouched = catalog.find_admin_by_email("c@y.com").await.unwrap().unwrap();
        assert_eq!(untouched.organization_name, "other");
    }
}
