// handlers/org/delete.rs - DELETE /org/delete handler

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
pub struct OrgDeleteRequest {
    pub organization_name: String,
}

/// Destroy the caller's organization: drop its store database and remove its
/// catalog records. The bearer claim must match the organization.
pub async fn org_delete(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthAdmin>,
    Json(payload): Json<OrgDeleteRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .destroy(&admin.organization, &payload.organization_name)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "message": format!("Organization '{}' deleted successfully", payload.organization_name)
        }
    })))
}
