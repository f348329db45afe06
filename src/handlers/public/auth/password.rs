use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub oob_code: String,
    #[serde(default)]
    pub new_password: String,
}

/// POST /auth/password-reset - ask the identity provider to mail a reset code
pub async fn password_reset(
    State(state): State<AppState>,
    payload: Result<Json<PasswordResetRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    state.accounts.send_password_reset(&body.email).await?;
    Ok(Json(json!({ "message": "Password reset email sent" })))
}

/// POST /auth/reset-password - complete a reset with the mailed code
pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    state.accounts.reset_password(&body.oob_code, &body.new_password).await?;
    Ok(Json(json!({ "message": "Password has been reset" })))
}
