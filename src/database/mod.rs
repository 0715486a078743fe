pub mod manager;

pub use manager::{DatabaseError, PoolManager, MASTER_DB_NAME, ORG_DB_PREFIX};
