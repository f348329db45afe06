// handlers/public/auth/login.rs - password sign-in through the identity provider

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::accounts::LoginResponse;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ApiError::bad_request("Email and password are required"));
        }
        Ok(())
    }
}

/**
 * POST /auth/login - administrator sign-in
 *
 * Input: `{ "email": "...", "password": "..." }`
 * Output: `{ "message", "uid", "role", "email", "token" }`
 *
 * 401 on bad credentials, 403 when the account is not an admin or its email
 * is unverified.
 */
pub async fn admin_login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(body) = payload?;
    body.validate()?;
    Ok(Json(state.accounts.admin_login(body.email.trim(), &body.password).await?))
}

/// POST /auth/user/login - sign-in for any account with a profile
pub async fn user_login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(body) = payload?;
    body.validate()?;
    Ok(Json(state.accounts.user_login(body.email.trim(), &body.password).await?))
}
