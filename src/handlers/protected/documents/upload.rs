use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::external::UploadedFile;
use crate::middleware::AuthUser;

/// Form field carrying the file
const DOCUMENT_FIELD: &str = "document";
/// Optional form field naming the request the document answers
const REQUEST_ID_FIELD: &str = "requestID";

/**
 * POST /documents/upload - multipart upload to the blob store
 *
 * Fields: `document` (file, required, exactly once), `requestID` (text,
 * optional). Output: `{ "message": "Document uploaded successfully", "url" }`.
 */
pub async fn upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    state.documents.authorize_upload(user.claims())?;

    // A body that is not multipart at all simply carries no file
    let mut file = None;
    let mut request_id = None;

    if let Ok(mut multipart) = multipart {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                DOCUMENT_FIELD => {
                    if file.is_some() {
                        return Err(ApiError::bad_request("Only one document may be uploaded"));
                    }
                    let file_name = field.file_name().unwrap_or(DOCUMENT_FIELD).to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;
                    file = Some(UploadedFile {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                REQUEST_ID_FIELD => request_id = Some(field.text().await?),
                _ => {}
            }
        }
    }

    let url = state
        .documents
        .upload(user.claims(), file, request_id.as_deref())
        .await?;

    Ok(Json(json!({
        "message": "Document uploaded successfully",
        "url": url,
    })))
}
