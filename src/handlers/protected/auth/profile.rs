use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::accounts::ProfileSummary;
use crate::types::Role;

/// GET /auth/profile - the calling admin's name and email
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileSummary>, ApiError> {
    user.require_any(&[Role::Admin])?;
    Ok(Json(state.accounts.profile(user.claims()).await?))
}

/// GET /auth/admin - succeeds only for admin tokens
pub async fn admin_check(Extension(user): Extension<AuthUser>) -> Result<Json<Value>, ApiError> {
    user.require_any(&[Role::Admin])?;
    Ok(Json(json!({
        "message": "Admin access granted",
        "uid": user.claims().subject,
    })))
}
