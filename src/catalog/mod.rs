//! Metadata catalog: the authoritative record of organizations and admins.
//!
//! The catalog stores and looks up records; it carries no lifecycle logic.
//! Each operation is a single atomic write or read against one table.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;

/// One tenant: a named customer unit owning one isolated database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub database_name: String,
    pub admin_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An operator account scoped to one organization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    /// Opaque PHC-format hash. The catalog and lifecycle manager never
    /// interpret it; hashing and verification live in the auth layer.
    pub hashed_password: String,
    pub organization_name: String,
    pub created_at: DateTime<Utc>,
}

/// Insertable organization record; id and timestamps are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub database_name: String,
    pub admin_id: Uuid,
}

/// Insertable admin record.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub email: String,
    pub hashed_password: String,
    pub organization_name: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    /// A unique constraint rejected the write (organization name or admin
    /// email already present).
    #[error("Duplicate key for {field}: {value}")]
    DuplicateKey { field: &'static str, value: String },

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] crate::database::DatabaseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Durable storage for organization and admin records.
///
/// Callers pre-check uniqueness, but implementations still reject duplicate
/// names and emails with [`CatalogError::DuplicateKey`].
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn find_org_by_name(&self, name: &str) -> Result<Option<Organization>, CatalogError>;

    async fn insert_org(&self, new: NewOrganization) -> Result<Organization, CatalogError>;

    /// Update the name and database name of the organization currently named
    /// `old_name`. Returns true when a record matched. Keying the update on
    /// the old name means a racing rename can match at most once.
    async fn update_org_name_and_db(
        &self,
        old_name: &str,
        new_name: &str,
        new_db_name: &str,
    ) -> Result<bool, CatalogError>;

    async fn delete_org(&self, name: &str) -> Result<(), CatalogError>;

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, CatalogError>;

    async fn insert_admin(&self, new: NewAdmin) -> Result<Admin, CatalogError>;

    /// Rebind every admin of `old_name` to `new_name`. Returns the number of
    /// records changed. Idempotent: a rerun with the same pair only touches
    /// records still carrying the old name.
    async fn update_admins_org_name(&self, old_name: &str, new_name: &str) -> Result<u64, CatalogError>;

    async fn delete_admins_for_org(&self, name: &str) -> Result<u64, CatalogError>;
}
