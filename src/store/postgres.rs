//! Postgres-backed store client.
//!
//! Each organization store is a dedicated Postgres database; each collection
//! is a jsonb table `(id bigserial, doc jsonb)`. Administrative operations
//! (existence checks, CREATE/DROP DATABASE) run against the `postgres`
//! database, the same way template cloning does in a shared-nothing tenant
//! setup.

use async_trait::async_trait;
use futures::stream::StreamExt;
use serde_json::Value;
use sqlx::{PgPool, Row};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::info;

use crate::config;
use crate::database::{DatabaseError, PoolManager, ORG_DB_PREFIX};
use crate::store::{is_valid_collection_name, DocumentStream, StoreClient, StoreError};

pub struct PgStoreClient {
    pools: Arc<PoolManager>,
}

impl PgStoreClient {
    pub fn new(pools: Arc<PoolManager>) -> Self {
        Self { pools }
    }

    /// The store client only ever manages organization databases; the master
    /// catalog and the admin database are out of its reach.
    fn check_org_db_name(db_name: &str) -> Result<(), StoreError> {
        if db_name.starts_with(ORG_DB_PREFIX) && PoolManager::is_valid_db_name(db_name) {
            Ok(())
        } else {
            Err(StoreError::Database(DatabaseError::InvalidDatabaseName(
                db_name.to_string(),
            )))
        }
    }

    fn check_collection(collection: &str) -> Result<(), StoreError> {
        if is_valid_collection_name(collection) {
            Ok(())
        } else {
            Err(StoreError::InvalidCollectionName(collection.to_string()))
        }
    }

    async fn database_exists(&self, db_name: &str) -> Result<bool, StoreError> {
        let admin = self.pools.admin_pool().await?;
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pg_database WHERE datname = $1")
            .bind(db_name)
            .fetch_one(&admin)
            .await?;
        Ok(count.0 > 0)
    }

    async fn create_database(&self, db_name: &str) -> Result<(), StoreError> {
        let admin = self.pools.admin_pool().await?;
        let query = format!("CREATE DATABASE {}", PoolManager::quote_identifier(db_name));
        sqlx::query(&query).execute(&admin).await?;
        info!("Created organization database: {}", db_name);
        Ok(())
    }

    async fn collection_exists(&self, pool: &PgPool, collection: &str) -> Result<bool, StoreError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pg_tables WHERE schemaname = 'public' AND tablename = $1",
        )
        .bind(collection)
        .fetch_one(pool)
        .await?;
        Ok(count.0 > 0)
    }
}

struct PageState {
    pool: PgPool,
    page_sql: String,
    page_size: i64,
    last_id: i64,
    buf: VecDeque<Value>,
    exhausted: bool,
}

#[async_trait]
impl StoreClient for PgStoreClient {
    async fn list_collections(&self, db_name: &str) -> Result<Vec<String>, StoreError> {
        Self::check_org_db_name(db_name)?;
        if !self.database_exists(db_name).await? {
            return Ok(Vec::new());
        }

        let pool = self.pools.org_pool(db_name).await?;
        let rows = sqlx::query(
            "SELECT tablename::text AS tablename FROM pg_tables WHERE schemaname = 'public' ORDER BY tablename",
        )
        .fetch_all(&pool)
        .await?;

        let mut names = Vec::with_capacity(rows.len());
        for row in rows {
            names.push(row.try_get::<String, _>("tablename")?);
        }
        Ok(names)
    }

    async fn read_all(&self, db_name: &str, collection: &str) -> Result<DocumentStream, StoreError> {
        Self::check_org_db_name(db_name)?;
        Self::check_collection(collection)?;

        if !self.database_exists(db_name).await? {
            return Ok(futures::stream::empty().boxed());
        }
        let pool = self.pools.org_pool(db_name).await?;
        if !self.collection_exists(&pool, collection).await? {
            return Ok(futures::stream::empty().boxed());
        }

        // Keyset pagination over the insertion-ordered id keeps the stream
        // lazy and its progress deterministic and resumable.
        let state = PageState {
            pool,
            page_sql: format!(
                "SELECT id, doc FROM {} WHERE id > $1 ORDER BY id LIMIT $2",
                PoolManager::quote_identifier(collection)
            ),
            page_size: config::config().database.copy_page_size,
            last_id: 0,
            buf: VecDeque::new(),
            exhausted: false,
        };

        let stream = futures::stream::try_unfold(state, |mut st| async move {
            loop {
                if let Some(doc) = st.buf.pop_front() {
                    return Ok(Some((doc, st)));
                }
                if st.exhausted {
                    return Ok(None);
                }
                let rows = sqlx::query(&st.page_sql)
                    .bind(st.last_id)
                    .bind(st.page_size)
                    .fetch_all(&st.pool)
                    .await?;
                if (rows.len() as i64) < st.page_size {
                    st.exhausted = true;
                }
                for row in rows {
                    st.last_id = row.try_get::<i64, _>("id")?;
                    st.buf.push_back(row.try_get::<Value, _>("doc")?);
                }
                if st.buf.is_empty() {
                    return Ok(None);
                }
            }
        });

        Ok(stream.boxed())
    }

    async fn write_one(&self, db_name: &str, collection: &str, doc: Value) -> Result<(), StoreError> {
        Self::check_org_db_name(db_name)?;
        Self::check_collection(collection)?;

        if !self.database_exists(db_name).await? {
            self.create_database(db_name).await?;
        }
        let pool = self.pools.org_pool(db_name).await?;

        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} (id BIGSERIAL PRIMARY KEY, doc JSONB NOT NULL)",
            PoolManager::quote_identifier(collection)
        );
        sqlx::query(&create).execute(&pool).await?;

        let insert = format!(
            "INSERT INTO {} (doc) VALUES ($1)",
            PoolManager::quote_identifier(collection)
        );
        sqlx::query(&insert).bind(doc).execute(&pool).await?;
        Ok(())
    }

    async fn delete_all(&self, db_name: &str, collection: &str) -> Result<(), StoreError> {
        Self::check_org_db_name(db_name)?;
        Self::check_collection(collection)?;

        if !self.database_exists(db_name).await? {
            return Ok(());
        }
        let pool = self.pools.org_pool(db_name).await?;
        if !self.collection_exists(&pool, collection).await? {
            return Ok(());
        }

        let delete = format!("DELETE FROM {}", PoolManager::quote_identifier(collection));
        sqlx::query(&delete).execute(&pool).await?;
        Ok(())
    }

    async fn drop_database(&self, db_name: &str) -> Result<(), StoreError> {
        Self::check_org_db_name(db_name)?;

        // Release our own connections first or Postgres refuses the drop.
        self.pools.evict_pool(db_name).await;

        let admin = self.pools.admin_pool().await?;
        let query = format!(
            "DROP DATABASE IF EXISTS {}",
            PoolManager::quote_identifier(db_name)
        );
        sqlx::query(&query).execute(&admin).await?;
        info!("Dropped organization database: {}", db_name);
        Ok(())
    }
}
