use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{Profile, ProfileFields};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::accounts::NewUser;
use crate::types::Role;

/// GET /auth/users - every profile except the caller
pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Profile>>, ApiError> {
    user.require_any(&[Role::Admin])?;
    Ok(Json(state.accounts.list_users(user.claims()).await?))
}

/**
 * POST /auth/users (alias POST /auth/add-user) - create an account
 *
 * Input: `{ "email", "password", "firstName", "lastName", "role", "promotion", "specialty" }`
 * where only email and password are required. Responds 201 with the stored
 * profile; the welcome mail is best effort.
 */
pub async fn add_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    user.require_any(&[Role::Admin])?;
    let Json(input) = payload?;

    let profile = state.accounts.add_user(user.claims(), input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "uid": profile.uid,
            "user": profile,
        })),
    ))
}

/// GET /auth/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    user.require_any(&[Role::Admin])?;
    Ok(Json(state.accounts.get_user(&id).await?))
}

/// PUT /auth/users/:id - overwrite the editable profile fields
pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<ProfileFields>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    user.require_any(&[Role::Admin])?;
    let Json(fields) = payload?;

    let profile = state.accounts.update_user(&id, &fields).await?;
    Ok(Json(json!({ "message": "User updated successfully", "user": profile })))
}

/// DELETE /auth/users/:id - remove the provider account and the profile
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    user.require_any(&[Role::Admin])?;
    state.accounts.delete_user(&id).await?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
