// handlers/org/create.rs - POST /org/create handler

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth;
use crate::error::ApiError;
use crate::handlers::utils::{validate_email, validate_password};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrgCreateRequest {
    pub organization_name: String,
    pub email: String,
    pub password: String,
}

/// Provision a new organization: its dedicated store database plus its first
/// admin account.
pub async fn org_create(
    State(state): State<AppState>,
    Json(payload): Json<OrgCreateRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    // Credentials are hashed at the boundary; the lifecycle core only ever
    // sees the opaque hash.
    let hashed = auth::hash_password(&payload.password)?;

    let org = state
        .service
        .provision(&payload.organization_name, &payload.email, &hashed)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": {
                "message": "Organization created",
                "organization": {
                    "id": org.id,
                    "organization_name": org.name,
                    "database_name": org.database_name,
                    "admin_id": org.admin_id
                }
            }
        })),
    ))
}
