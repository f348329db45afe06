use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::Claims;
use crate::database::models::NewNotification;
use crate::database::{DatabaseError, RequestStore, Store};
use crate::external::{BlobError, BlobStore, UploadedFile};
use crate::services::policy::WorkflowPolicy;
use crate::services::workflow::{authorize, WorkflowError};
use crate::types::{NotificationCategory, RequestStatus};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] DatabaseError),

    #[error(transparent)]
    Blob(#[from] BlobError),
}

impl From<WorkflowError> for UploadError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Forbidden(msg) => UploadError::Forbidden(msg),
            WorkflowError::InvalidInput(msg) => UploadError::InvalidInput(msg),
            WorkflowError::NotFound(msg) => UploadError::NotFound(msg),
            WorkflowError::Store(e) => UploadError::Store(e),
        }
    }
}

/// Stores uploaded documents and records the upload against a request
pub struct DocumentService {
    policy: WorkflowPolicy,
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
}

impl DocumentService {
    pub fn new(policy: WorkflowPolicy, store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { policy, store, blobs }
    }

    /// Checked before the request body is read
    pub fn authorize_upload(&self, claims: &Claims) -> Result<(), UploadError> {
        Ok(authorize(claims, &self.policy.uploader_roles, "uploading documents")?)
    }

    /// Record the upload against `request_id` (if given), then hand the file
    /// to the blob store. The request side effects are kept even when the
    /// blob store fails.
    pub async fn upload(
        &self,
        claims: &Claims,
        file: Option<UploadedFile>,
        request_id: Option<&str>,
    ) -> Result<String, UploadError> {
        self.authorize_upload(claims)?;

        let file = file.ok_or_else(|| UploadError::InvalidInput("No file uploaded".to_string()))?;

        if let Some(raw_id) = request_id.map(str::trim).filter(|s| !s.is_empty()) {
            self.record_upload(raw_id).await?;
        }

        let file_name = file.file_name.clone();
        let url = self.blobs.upload(file).await.map_err(|e| {
            error!("Blob upload of {} failed: {}", file_name, e);
            e
        })?;

        info!("Uploaded {} for {}: {}", file_name, claims.subject, url);
        Ok(url)
    }

    async fn record_upload(&self, raw_id: &str) -> Result<(), UploadError> {
        let not_found = || UploadError::NotFound(format!("Request {} not found", raw_id));

        let id = Uuid::parse_str(raw_id).map_err(|_| not_found())?;
        let request = self.store.get_request(id).await?.ok_or_else(not_found)?;

        let notification = NewNotification {
            recipient_id: request.requester_id.clone(),
            request_id: Some(id),
            message: format!("A document was uploaded for your {} request", request.request_type),
            category: NotificationCategory::DocumentUploaded,
            status: request.status,
            created_at: Utc::now(),
        };

        // Only a request that is still not started moves forward
        let status = self
            .store
            .advance_status(id, RequestStatus::NotStarted, RequestStatus::InProgress, notification)
            .await?
            .ok_or_else(not_found)?;

        if status != request.status {
            info!("Request {} moved to {} on upload", id, status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::DocumentRequest;
    use crate::database::{MemoryStore, NotificationStore};
    use crate::external::MemoryBlobStore;
    use crate::types::Role;
    use async_trait::async_trait;

    struct BrokenBlobStore;

    #[async_trait]
    impl BlobStore for BrokenBlobStore {
        async fn upload(&self, _file: UploadedFile) -> Result<String, BlobError> {
            Err(BlobError::Rejected { status: 503, message: "offline".into() })
        }
    }

    fn staff() -> Claims {
        Claims {
            subject: "staff-1".into(),
            role: Some(Role::Personnel),
            email: None,
            email_verified: true,
        }
    }

    fn pdf() -> Option<UploadedFile> {
        Some(UploadedFile {
            file_name: "transcript.pdf".into(),
            content_type: Some("application/pdf".into()),
            bytes: vec![1, 2, 3],
        })
    }

    async fn seeded(status: RequestStatus) -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store
            .seed_request(DocumentRequest {
                id,
                requester_id: "student-1".into(),
                requester_role: Role::Student,
                request_type: "transcript".into(),
                message: "x".into(),
                status,
                created_at: None,
            })
            .await;
        (store, id)
    }

    #[tokio::test]
    async fn upload_moves_not_started_request_forward() {
        let (store, id) = seeded(RequestStatus::NotStarted).await;
        let service = DocumentService::new(
            WorkflowPolicy::default(),
            Arc::new(store.clone()),
            Arc::new(MemoryBlobStore::new()),
        );

        let url = service.upload(&staff(), pdf(), Some(&id.to_string())).await.unwrap();
        assert!(url.ends_with("transcript.pdf"));

        let request = store.get_request(id).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::InProgress);
        let notes = store.notifications_for("student-1").await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].category, NotificationCategory::DocumentUploaded);
        assert_eq!(notes[0].status, RequestStatus::InProgress);
    }

    #[tokio::test]
    async fn completed_request_keeps_status_but_is_notified() {
        let (store, id) = seeded(RequestStatus::Completed).await;
        let service = DocumentService::new(
            WorkflowPolicy::default(),
            Arc::new(store.clone()),
            Arc::new(MemoryBlobStore::new()),
        );

        service.upload(&staff(), pdf(), Some(&id.to_string())).await.unwrap();
        assert_eq!(store.get_request(id).await.unwrap().unwrap().status, RequestStatus::Completed);
        assert_eq!(store.notifications_for("student-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blob_failure_keeps_recorded_side_effects() {
        let (store, id) = seeded(RequestStatus::NotStarted).await;
        let service = DocumentService::new(
            WorkflowPolicy::default(),
            Arc::new(store.clone()),
            Arc::new(BrokenBlobStore),
        );

        let err = service.upload(&staff(), pdf(), Some(&id.to_string())).await.unwrap_err();
        assert!(matches!(err, UploadError::Blob(_)));
        assert_eq!(store.get_request(id).await.unwrap().unwrap().status, RequestStatus::InProgress);
        assert_eq!(store.notifications_for("student-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_wrong_role_missing_file_and_unknown_request() {
        let store = MemoryStore::new();
        let service = DocumentService::new(
            WorkflowPolicy::default(),
            Arc::new(store.clone()),
            Arc::new(MemoryBlobStore::new()),
        );
        let student = Claims { role: Some(Role::Student), ..staff() };

        assert!(matches!(service.upload(&student, pdf(), None).await, Err(UploadError::Forbidden(_))));
        assert!(matches!(service.upload(&staff(), None, None).await, Err(UploadError::InvalidInput(_))));
        assert!(matches!(
            service.upload(&staff(), pdf(), Some("not-a-uuid")).await,
            Err(UploadError::NotFound(_))
        ));
        assert!(matches!(
            service.upload(&staff(), pdf(), Some(&Uuid::new_v4().to_string())).await,
            Err(UploadError::NotFound(_))
        ));
        assert!(store.all_notifications().await.is_empty());

        // Blank request id means no request
        assert!(service.upload(&staff(), pdf(), Some("  ")).await.is_ok());
    }
}
