// handlers/org/get.rs - GET /org/get handler

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrgGetQuery {
    pub organization_name: String,
}

pub async fn org_get(
    State(state): State<AppState>,
    Query(params): Query<OrgGetQuery>,
) -> Result<Json<Value>, ApiError> {
    let org = state.service.get_by_name(&params.organization_name).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "id": org.id,
            "organization_name": org.name,
            "database_name": org.database_name,
            "admin_id": org.admin_id
        }
    })))
}
