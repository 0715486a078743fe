//! Postgres-backed catalog over two tables in the master database.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::catalog::{Admin, Catalog, CatalogError, NewAdmin, NewOrganization, Organization};
use crate::database::PoolManager;

pub struct PgCatalog {
    pools: Arc<PoolManager>,
    schema_ready: OnceCell<()>,
}

impl PgCatalog {
    pub fn new(pools: Arc<PoolManager>) -> Self {
        Self {
            pools,
            schema_ready: OnceCell::new(),
        }
    }

    /// Master pool with the catalog schema bootstrapped. There is no startup
    /// migration step; the first catalog call creates the tables.
    async fn pool(&self) -> Result<PgPool, CatalogError> {
        let pool = self.pools.master_pool().await?;
        self.schema_ready
            .get_or_try_init(|| async { ensure_schema(&pool).await })
            .await?;
        Ok(pool)
    }
}

async fn ensure_schema(pool: &PgPool) -> Result<(), CatalogError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS organizations (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            database_name TEXT NOT NULL,
            admin_id UUID NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            id UUID PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            hashed_password TEXT NOT NULL,
            organization_name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Classify unique-constraint violations so raw store errors never surface.
fn classify_insert_error(err: sqlx::Error, field: &'static str, value: &str) -> CatalogError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return CatalogError::DuplicateKey {
                field,
                value: value.to_string(),
            };
        }
    }
    CatalogError::Sqlx(err)
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn find_org_by_name(&self, name: &str) -> Result<Option<Organization>, CatalogError> {
        let pool = self.pool().await?;
        let org = sqlx::query_as::<_, Organization>(
            "SELECT id, name, database_name, admin_id, created_at, updated_at
             FROM organizations WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&pool)
        .await?;
        Ok(org)
    }

    async fn insert_org(&self, new: NewOrganization) -> Result<Organization, CatalogError> {
        let pool = self.pool().await?;
        let now = Utc::now();
        let org = Organization {
            id: Uuid::new_v4(),
            name: new.name,
            database_name: new.database_name,
            admin_id: new.admin_id,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO organizations (id, name, database_name, admin_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(org.id)
        .bind(&org.name)
        .bind(&org.database_name)
        .bind(org.admin_id)
        .bind(org.created_at)
        .bind(org.updated_at)
        .execute(&pool)
        .await
        .map_err(|e| classify_insert_error(e, "name", &org.name))?;

        Ok(org)
    }

    async fn update_org_name_and_db(
        &self,
        old_name: &str,
        new_name: &str,
        new_db_name: &str,
    ) -> Result<bool, CatalogError> {
        let pool = self.pool().await?;
        let result = sqlx::query(
            "UPDATE organizations
             SET name = $2, database_name = $3, updated_at = $4
             WHERE name = $1",
        )
        .bind(old_name)
        .bind(new_name)
        .bind(new_db_name)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .map_err(|e| classify_insert_error(e, "name", new_name))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_org(&self, name: &str) -> Result<(), CatalogError> {
        let pool = self.pool().await?;
        sqlx::query("DELETE FROM organizations WHERE name = $1")
            .bind(name)
            .execute(&pool)
            .await?;
        Ok(())
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, CatalogError> {
        let pool = self.pool().await?;
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT id, email, hashed_password, organization_name, created_at
             FROM admins WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&pool)
        .await?;
        Ok(admin)
    }

    async fn insert_admin(&self, new: NewAdmin) -> Result<Admin, CatalogError> {
        let pool = self.pool().await?;
        let admin = Admin {
            id: Uuid::new_v4(),
            email: new.email,
            hashed_password: new.hashed_password,
            organization_name: new.organization_name,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO admins (id, email, hashed_password, organization_name, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(admin.id)
        .bind(&admin.email)
        .bind(&admin.hashed_password)
        .bind(&admin.organization_name)
        .bind(admin.created_at)
        .execute(&pool)
        .await
        .map_err(|e| classify_insert_error(e, "email", &admin.email))?;

        Ok(admin)
    }

    async fn update_admins_org_name(&self, old_name: &str, new_name: &str) -> Result<u64, CatalogError> {
        let pool = self.pool().await?;
        let result = sqlx::query("UPDATE admins SET organization_name = $2 WHERE organization_name = $1")
            .bind(old_name)
            .bind(new_name)
            .execute(&pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_admins_for_org(&self, name: &str) -> Result<u64, CatalogError> {
        let pool = self.pool().await?;
        let result = sqlx::query("DELETE FROM admins WHERE organization_name = $1")
            .bind(name)
            .execute(&pool)
            .await?;
        Ok(result.rows_affected())
    }
}
