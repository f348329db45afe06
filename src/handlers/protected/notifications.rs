use axum::{extract::State, Extension, Json};

use crate::app::AppState;
use crate::database::models::Notification;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// GET /notifications - notifications addressed to the caller, oldest first
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(state.workflow.list_notifications(user.claims()).await?))
}
