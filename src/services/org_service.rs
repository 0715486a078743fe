use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::catalog::{Admin, Catalog, CatalogError, NewAdmin, NewOrganization, Organization};
use crate::database::ORG_DB_PREFIX;
use crate::store::{StoreClient, StoreError};

/// Collection used for the sentinel write that forces lazy database
/// creation. The document is removed immediately after.
const SENTINEL_COLLECTION: &str = "__init__";

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Organization name already exists: {0}")]
    NameTaken(String),

    #[error("Admin email already exists: {0}")]
    EmailTaken(String),

    #[error("Organization not found: {0}")]
    NotFound(String),

    #[error("Not authorized to manage organization: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("Copy incomplete migrating {source_db} to {target_db}: {cause}")]
    CopyIncomplete {
        source_db: String,
        target_db: String,
        #[source]
        cause: StoreError,
    },

    /// The organization record was repointed but rebinding its admins failed.
    /// Recovery is a retry of [`OrgService::repair_admin_bindings`] alone,
    /// never a full rename redo.
    #[error("Catalog inconsistent after rename {old} -> {new}: {cause}")]
    CatalogInconsistent {
        old: String,
        new: String,
        #[source]
        cause: CatalogError,
    },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Result of a completed rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamedOrg {
    pub organization_name: String,
    pub database_name: String,
}

/// Tenant lifecycle manager: provisions, renames, and destroys organization
/// stores while keeping the metadata catalog consistent with their physical
/// state. Receives its catalog and store handles at construction.
pub struct OrgService {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn StoreClient>,
}

/// Normalize an organization name the way every caller-facing operation does:
/// trimmed and lower-cased.
pub fn normalize_org_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Derive the store database name for an organization. This derivation is the
/// only linkage between the catalog and the physical store.
pub fn database_name_for(name: &str) -> String {
    format!("{}{}", ORG_DB_PREFIX, name)
}

impl OrgService {
    pub fn new(catalog: Arc<dyn Catalog>, store: Arc<dyn StoreClient>) -> Self {
        Self { catalog, store }
    }

    /// Create a new organization together with its first admin.
    ///
    /// The store is created before any catalog write: a crash in between
    /// leaves an orphaned empty database, which is harmless, while the
    /// reverse order could leave catalog records pointing at nothing.
    pub async fn provision(
        &self,
        name: &str,
        admin_email: &str,
        hashed_password: &str,
    ) -> Result<Organization, LifecycleError> {
        let name = normalize_org_name(name);
        validate_org_name(&name)?;

        if self.catalog.find_org_by_name(&name).await?.is_some() {
            return Err(LifecycleError::NameTaken(name));
        }
        if self.catalog.find_admin_by_email(admin_email).await?.is_some() {
            return Err(LifecycleError::EmailTaken(admin_email.to_string()));
        }

        // (a) Create the empty organization store
        let database_name = database_name_for(&name);
        self.ensure_store_created(&database_name).await?;

        // (b) Insert the admin bound to the new organization
        let admin = self
            .catalog
            .insert_admin(NewAdmin {
                email: admin_email.to_string(),
                hashed_password: hashed_password.to_string(),
                organization_name: name.clone(),
            })
            .await
            .map_err(|e| match e {
                CatalogError::DuplicateKey { .. } => {
                    LifecycleError::EmailTaken(admin_email.to_string())
                }
                other => LifecycleError::Catalog(other),
            })?;

        // (c) Insert the organization record
        let org = self
            .catalog
            .insert_org(NewOrganization {
                name: name.clone(),
                database_name,
                admin_id: admin.id,
            })
            .await
            .map_err(|e| match e {
                CatalogError::DuplicateKey { .. } => LifecycleError::NameTaken(name.clone()),
                other => LifecycleError::Catalog(other),
            })?;

        info!("Provisioned organization {} ({})", org.name, org.database_name);
        Ok(org)
    }

    /// Look up an organization by (normalized) name.
    pub async fn get_by_name(&self, name: &str) -> Result<Organization, LifecycleError> {
        let name = normalize_org_name(name);
        self.catalog
            .find_org_by_name(&name)
            .await?
            .ok_or(LifecycleError::NotFound(name))
    }

    /// Rename an organization: copy its store to the new name, repoint the
    /// organization record, then rebind its admins.
    ///
    /// Steps run strictly in that order. A failed copy halts before the
    /// repoint, leaving the old store authoritative and the target store as a
    /// discardable artifact. The old store is never dropped here; it stays
    /// behind as a recovery point until an operator removes it.
    pub async fn rename(
        &self,
        caller_org: &str,
        current_name: &str,
        target_name: &str,
    ) -> Result<RenamedOrg, LifecycleError> {
        let current = normalize_org_name(current_name);
        let target = normalize_org_name(target_name);

        if normalize_org_name(caller_org) != current {
            return Err(LifecycleError::Forbidden(current));
        }
        if current == target {
            return Err(LifecycleError::InvalidInput(
                "new organization name must be different".to_string(),
            ));
        }
        validate_org_name(&target)?;

        if self.catalog.find_org_by_name(&target).await?.is_some() {
            return Err(LifecycleError::NameTaken(target));
        }
        let org = self
            .catalog
            .find_org_by_name(&current)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(current.clone()))?;

        let source_db = org.database_name;
        let target_db = database_name_for(&target);

        // Step 1: start from an empty target store. A retried rename would
        // otherwise copy into a partially populated database and duplicate
        // documents; dropping first is safe because the drop is idempotent
        // and the target name is unclaimed in the catalog.
        self.store
            .drop_database(&target_db)
            .await
            .map_err(LifecycleError::StoreUnavailable)?;
        self.ensure_store_created(&target_db).await?;

        // Step 2: copy every collection, document by document, unmodified.
        self.copy_store(&source_db, &target_db)
            .await
            .map_err(|cause| LifecycleError::CopyIncomplete {
                source_db: source_db.clone(),
                target_db: target_db.clone(),
                cause,
            })?;

        // Step 3: repoint the organization record, keyed by the old name so
        // a racing rename can match at most once.
        let matched = self
            .catalog
            .update_org_name_and_db(&current, &target, &target_db)
            .await
            .map_err(|e| match e {
                CatalogError::DuplicateKey { .. } => LifecycleError::NameTaken(target.clone()),
                other => LifecycleError::Catalog(other),
            })?;
        if !matched {
            // Another rename won the race after our precondition check.
            return Err(LifecycleError::NotFound(current));
        }

        // Step 4: rebind every admin of the old name.
        match self.catalog.update_admins_org_name(&current, &target).await {
            Ok(changed) => {
                info!(
                    "Renamed organization {} -> {} ({} admins rebound); old store {} retained",
                    current, target, changed, source_db
                );
            }
            Err(cause) => {
                error!(
                    "Organization {} repointed to {} but admin rebind failed; repair required: {}",
                    current, target, cause
                );
                return Err(LifecycleError::CatalogInconsistent {
                    old: current,
                    new: target,
                    cause,
                });
            }
        }

        Ok(RenamedOrg {
            organization_name: target,
            database_name: target_db,
        })
    }

    /// Destroy an organization: drop its store, then delete its admins and
    /// its catalog record.
    ///
    /// The store goes first: a crash afterward leaves stale but harmless
    /// metadata, and a rerun of destroy still succeeds because the drop is a
    /// no-op on an absent database. Deleting metadata first would instead
    /// leak an unreachable live store.
    pub async fn destroy(&self, caller_org: &str, name: &str) -> Result<(), LifecycleError> {
        let name = normalize_org_name(name);
        if normalize_org_name(caller_org) != name {
            return Err(LifecycleError::Forbidden(name));
        }

        let org = self
            .catalog
            .find_org_by_name(&name)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(name.clone()))?;

        self.store
            .drop_database(&org.database_name)
            .await
            .map_err(LifecycleError::StoreUnavailable)?;

        self.catalog.delete_admins_for_org(&name).await?;
        self.catalog.delete_org(&name).await?;

        info!("Destroyed organization {} ({})", name, org.database_name);
        Ok(())
    }

    /// Create an additional admin bound to an existing organization.
    pub async fn create_admin(
        &self,
        email: &str,
        hashed_password: &str,
        organization_name: &str,
    ) -> Result<Admin, LifecycleError> {
        let organization_name = normalize_org_name(organization_name);
        if self.catalog.find_org_by_name(&organization_name).await?.is_none() {
            return Err(LifecycleError::NotFound(organization_name));
        }
        if self.catalog.find_admin_by_email(email).await?.is_some() {
            return Err(LifecycleError::EmailTaken(email.to_string()));
        }

        self.catalog
            .insert_admin(NewAdmin {
                email: email.to_string(),
                hashed_password: hashed_password.to_string(),
                organization_name,
            })
            .await
            .map_err(|e| match e {
                CatalogError::DuplicateKey { .. } => LifecycleError::EmailTaken(email.to_string()),
                other => LifecycleError::Catalog(other),
            })
    }

    /// Repair pass for a rename that failed between repoint and reconcile:
    /// rerun the admin rebind alone. Idempotent; only records still carrying
    /// the old name are touched.
    pub async fn repair_admin_bindings(
        &self,
        old_name: &str,
        new_name: &str,
    ) -> Result<u64, LifecycleError> {
        let old = normalize_org_name(old_name);
        let new = normalize_org_name(new_name);

        if self.catalog.find_org_by_name(&new).await?.is_none() {
            return Err(LifecycleError::NotFound(new));
        }

        let changed = self.catalog.update_admins_org_name(&old, &new).await?;
        info!("Repaired admin bindings {} -> {}: {} records", old, new, changed);
        Ok(changed)
    }

    /// Force lazy creation of a store database by writing and immediately
    /// removing a sentinel document.
    async fn ensure_store_created(&self, database_name: &str) -> Result<(), LifecycleError> {
        let sentinel = json!({ "created_at": true });
        self.store
            .write_one(database_name, SENTINEL_COLLECTION, sentinel)
            .await
            .map_err(LifecycleError::StoreUnavailable)?;
        self.store
            .delete_all(database_name, SENTINEL_COLLECTION)
            .await
            .map_err(LifecycleError::StoreUnavailable)?;
        Ok(())
    }

    /// Sequential collection-by-collection, document-by-document copy.
    /// Documents are opaque payloads; nothing is transformed. Writes to the
    /// source during the copy window are not reflected in the target.
    async fn copy_store(&self, source_db: &str, target_db: &str) -> Result<(), StoreError> {
        let collections = self.store.list_collections(source_db).await?;
        for collection in collections {
            let mut documents = self.store.read_all(source_db, &collection).await?;
            while let Some(doc) = documents.try_next().await? {
                self.store.write_one(target_db, &collection, doc).await?;
            }
        }
        Ok(())
    }
}

/// Validate a normalized organization name. The name is embedded into the
/// store database identifier, so the character set is restricted.
fn validate_org_name(name: &str) -> Result<(), LifecycleError> {
    if name.len() < 3 || name.len() > 50 {
        return Err(LifecycleError::InvalidInput(
            "organization name must be 3-50 characters".to_string(),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(LifecycleError::InvalidInput(
            "organization name can only contain lowercase letters, numbers, and underscores".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize_org_name(" Acme "), "acme");
        assert_eq!(normalize_org_name("ACME2"), "acme2");
    }

    #[test]
    fn derives_database_names() {
        assert_eq!(database_name_for("acme"), "org_acme");
        assert_eq!(database_name_for("acme2"), "org_acme2");
    }

    #[test]
    fn validates_org_names() {
        assert!(validate_org_name("acme").is_ok());
        assert!(validate_org_name("acme_2").is_ok());
        assert!(validate_org_name("ab").is_err());
        assert!(validate_org_name("Acme").is_err());
        assert!(validate_org_name("acme-inc").is_err());
        assert!(validate_org_name(&"a".repeat(51)).is_err());
    }
}
