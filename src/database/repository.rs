use async_trait::async_trait;
use uuid::Uuid;

use crate::database::models::{
    DocumentRequest, NewDocumentRequest, NewNotification, Notification, Profile, ProfileFields,
};
use crate::database::DatabaseError;
use crate::types::{RequestStatus, Role};

/// Profile records keyed by subject id
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>, DatabaseError>;

    async fn list_profiles(&self) -> Result<Vec<Profile>, DatabaseError>;

    /// Profiles whose stored role parses to one of `roles`
    async fn profiles_with_roles(&self, roles: &[Role]) -> Result<Vec<Profile>, DatabaseError>;

    /// Insert or replace the profile with the same uid
    async fn put_profile(&self, profile: &Profile) -> Result<(), DatabaseError>;

    /// Returns false when no profile with that uid exists
    async fn update_profile(&self, uid: &str, fields: &ProfileFields) -> Result<bool, DatabaseError>;

    /// Returns false when no profile with that uid exists
    async fn delete_profile(&self, uid: &str) -> Result<bool, DatabaseError>;
}

/// Document request records
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Insert the request and its notification fan-out as one atomic write.
    /// Each notification's `request_id` is set to the new request's id.
    async fn create_request(
        &self,
        request: NewDocumentRequest,
        fan_out: Vec<NewNotification>,
    ) -> Result<DocumentRequest, DatabaseError>;

    async fn get_request(&self, id: Uuid) -> Result<Option<DocumentRequest>, DatabaseError>;

    /// All requests, oldest first; records without a timestamp sort first
    async fn list_requests(&self) -> Result<Vec<DocumentRequest>, DatabaseError>;

    async fn list_requests_by_requester(
        &self,
        requester_id: &str,
    ) -> Result<Vec<DocumentRequest>, DatabaseError>;

    /// Overwrite the status (last writer wins) and record `notification` in
    /// the same write. Returns false, writing nothing, when the id is unknown.
    async fn set_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        notification: NewNotification,
    ) -> Result<bool, DatabaseError>;

    /// Move the request to `to` only if it is still in `from`, and record
    /// `notification` stamped with the resulting status, in one write.
    /// Returns the resulting status, or None (writing nothing) when the id is
    /// unknown.
    async fn advance_status(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
        notification: NewNotification,
    ) -> Result<Option<RequestStatus>, DatabaseError>;

    /// Cheap connectivity probe used by `/health`
    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// Notification reads; writes ride along with request writes
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Notifications addressed to `recipient_id`, oldest first
    async fn notifications_for(&self, recipient_id: &str) -> Result<Vec<Notification>, DatabaseError>;
}

/// Everything the gateway persists, behind one handle
pub trait Store: ProfileStore + RequestStore + NotificationStore {}

impl<T> Store for T where T: ProfileStore + RequestStore + NotificationStore {}
