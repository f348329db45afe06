use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::DocumentRequest;
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    #[serde(rename = "type", default)]
    pub request_type: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    #[serde(default)]
    pub status: String,
}

/// Ids that are not UUIDs cannot name a stored request; they map to the nil
/// id so role and input checks still run before the 404.
fn request_key(raw: &str) -> Uuid {
    Uuid::parse_str(raw).unwrap_or(Uuid::nil())
}

/// POST /documents/requests - `{type, message}` -> `{success: true, id}`
pub async fn create_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateRequestBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let id = state
        .workflow
        .create(user.claims(), &body.request_type, &body.message)
        .await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

/// GET /documents/requests - every request (staff only)
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<DocumentRequest>>, ApiError> {
    Ok(Json(state.workflow.list_all(user.claims()).await?))
}

/// GET /documents/requests/:id
pub async fn get_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DocumentRequest>, ApiError> {
    Ok(Json(state.workflow.get(request_key(&id), user.claims()).await?))
}

/// GET /documents/my-requests - the caller's own requests
pub async fn my_requests(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<DocumentRequest>>, ApiError> {
    Ok(Json(state.workflow.list_mine(user.claims()).await?))
}

/// PATCH /documents/requests/:id - `{status}` -> `{success: true}`
pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    state.workflow.update_status(request_key(&id), &body.status, user.claims()).await?;
    Ok(Json(json!({ "success": true })))
}
