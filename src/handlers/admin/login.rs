// handlers/admin/login.rs - POST /admin/login handler

use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{self, Claims};
use crate::config;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

/// Authenticate an admin and issue a bearer token carrying the admin id and
/// its bound organization.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let admin = state
        .catalog
        .find_admin_by_email(&payload.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let verified = auth::verify_password(&payload.password, &admin.hashed_password)?;
    if !verified {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let claims = Claims::new(admin.id, admin.organization_name.clone());
    let token = auth::generate_jwt(claims)?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "access_token": token,
            "token_type": "bearer",
            "expires_in": config::config().security.jwt_expiry_hours * 3600
        }
    })))
}
