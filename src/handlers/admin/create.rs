// handlers/admin/create.rs - POST /admin/create handler

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth;
use crate::error::ApiError;
use crate::handlers::utils::{validate_email, validate_password};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminCreateRequest {
    pub email: String,
    pub password: String,
    pub organization_name: String,
}

/// Create an additional admin account bound to an existing organization.
pub async fn admin_create(
    State(state): State<AppState>,
    Json(payload): Json<AdminCreateRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    let hashed = auth::hash_password(&payload.password)?;

    let admin = state
        .service
        .create_admin(&payload.email, &hashed, &payload.organization_name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": {
                "admin_id": admin.id
            }
        })),
    ))
}
