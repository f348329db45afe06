use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{
    DocumentRequest, NewDocumentRequest, NewNotification, Notification, Profile, ProfileFields,
};
use crate::database::repository::{NotificationStore, ProfileStore, RequestStore};
use crate::database::DatabaseError;
use crate::types::{RequestStatus, Role};

#[derive(Default)]
struct Tables {
    profiles: HashMap<String, Profile>,
    requests: HashMap<Uuid, DocumentRequest>,
    notifications: Vec<Notification>,
}

/// In-process store used by tests and `serve --in-memory`.
/// Every multi-record write happens under a single write lock.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a request as-is, bypassing the workflow (fixtures, legacy records)
    pub async fn seed_request(&self, request: DocumentRequest) {
        self.tables.write().await.requests.insert(request.id, request);
    }

    pub async fn request_count(&self) -> usize {
        self.tables.read().await.requests.len()
    }

    pub async fn all_notifications(&self) -> Vec<Notification> {
        self.tables.read().await.notifications.clone()
    }
}

fn sort_requests(requests: &mut [DocumentRequest]) {
    // None sorts before Some, matching NULLS FIRST
    requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>, DatabaseError> {
        Ok(self.tables.read().await.profiles.get(uid).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, DatabaseError> {
        let mut profiles: Vec<Profile> = self.tables.read().await.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.uid.cmp(&b.uid));
        Ok(profiles)
    }

    async fn profiles_with_roles(&self, roles: &[Role]) -> Result<Vec<Profile>, DatabaseError> {
        let mut profiles: Vec<Profile> = self
            .tables
            .read()
            .await
            .profiles
            .values()
            .filter(|p| p.has_any_role(roles))
            .cloned()
            .collect();
        profiles.sort_by(|a, b| a.uid.cmp(&b.uid));
        Ok(profiles)
    }

    async fn put_profile(&self, profile: &Profile) -> Result<(), DatabaseError> {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.uid.clone(), profile.clone());
        Ok(())
    }

    async fn update_profile(&self, uid: &str, fields: &ProfileFields) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables.profiles.get_mut(uid) {
            Some(profile) => {
                fields.apply_to(profile);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_profile(&self, uid: &str) -> Result<bool, DatabaseError> {
        Ok(self.tables.write().await.profiles.remove(uid).is_some())
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn create_request(
        &self,
        request: NewDocumentRequest,
        fan_out: Vec<NewNotification>,
    ) -> Result<DocumentRequest, DatabaseError> {
        let id = Uuid::new_v4();
        let record = request.with_id(id);

        let mut tables = self.tables.write().await;
        tables.requests.insert(id, record.clone());
        tables.notifications.extend(
            fan_out
                .into_iter()
                .map(|n| NewNotification { request_id: Some(id), ..n }.with_id(Uuid::new_v4())),
        );

        Ok(record)
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<DocumentRequest>, DatabaseError> {
        Ok(self.tables.read().await.requests.get(&id).cloned())
    }

    async fn list_requests(&self) -> Result<Vec<DocumentRequest>, DatabaseError> {
        let mut requests: Vec<DocumentRequest> =
            self.tables.read().await.requests.values().cloned().collect();
        sort_requests(&mut requests);
        Ok(requests)
    }

    async fn list_requests_by_requester(
        &self,
        requester_id: &str,
    ) -> Result<Vec<DocumentRequest>, DatabaseError> {
        let mut requests: Vec<DocumentRequest> = self
            .tables
            .read()
            .await
            .requests
            .values()
            .filter(|r| r.requester_id == requester_id)
            .cloned()
            .collect();
        sort_requests(&mut requests);
        Ok(requests)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        notification: NewNotification,
    ) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables.requests.get_mut(&id) {
            Some(request) => request.status = status,
            None => return Ok(false),
        }
        tables.notifications.push(notification.with_id(Uuid::new_v4()));
        Ok(true)
    }

    async fn advance_status(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
        notification: NewNotification,
    ) -> Result<Option<RequestStatus>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let status = match tables.requests.get_mut(&id) {
            Some(request) => {
                if request.status == from {
                    request.status = to;
                }
                request.status
            }
            None => return Ok(None),
        };
        tables
            .notifications
            .push(NewNotification { status, ..notification }.with_id(Uuid::new_v4()));
        Ok(Some(status))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn notifications_for(&self, recipient_id: &str) -> Result<Vec<Notification>, DatabaseError> {
        // Vec order is insertion order, which is creation order
        Ok(self
            .tables
            .read()
            .await
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect())
    }
}
