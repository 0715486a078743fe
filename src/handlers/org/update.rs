// handlers/org/update.rs - PUT /org/update handler

use axum::{
    extract::{Extension, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthAdmin;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrgUpdateRequest {
    pub organization_name: String,
    pub new_organization_name: String,
}

/// Rename the caller's organization, migrating its store data to the new
/// database and repointing catalog records. The bearer claim must match the
/// organization being renamed.
pub async fn org_update(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthAdmin>,
    Json(payload): Json<OrgUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let renamed = state
        .service
        .rename(
            &admin.organization,
            &payload.organization_name,
            &payload.new_organization_name,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "message": "Organization renamed and data migrated",
            "organization_name": renamed.organization_name,
            "database_name": renamed.database_name
        }
    })))
}
