pub mod org_service;

pub use org_service::{database_name_for, normalize_org_name, LifecycleError, OrgService, RenamedOrg};
