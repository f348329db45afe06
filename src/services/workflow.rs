use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::Claims;
use crate::database::models::{DocumentRequest, NewDocumentRequest, NewNotification, Notification};
use crate::database::{DatabaseError, NotificationStore, ProfileStore, RequestStore, Store};
use crate::services::policy::WorkflowPolicy;
use crate::types::{NotificationCategory, RequestStatus, Role};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// Reject callers whose claimed role is outside `allowed`
pub(crate) fn authorize(claims: &Claims, allowed: &[Role], action: &str) -> Result<(), WorkflowError> {
    if claims.has_any_role(allowed) {
        debug!("{} authorized for {} ({:?})", action, claims.subject, claims.role);
        Ok(())
    } else {
        warn!("{} denied for {} with role {:?}", action, claims.subject, claims.role);
        Err(WorkflowError::Forbidden(format!(
            "Access denied: {} requires one of [{}]",
            action,
            role_list(allowed)
        )))
    }
}

fn role_list(roles: &[Role]) -> String {
    roles.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
}

/// Document request lifecycle: creation with staff fan-out, reads, and
/// status transitions that notify the requester.
pub struct WorkflowEngine {
    policy: WorkflowPolicy,
    store: Arc<dyn Store>,
}

impl WorkflowEngine {
    pub fn new(policy: WorkflowPolicy, store: Arc<dyn Store>) -> Self {
        Self { policy, store }
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    /// Create a request for the caller and notify the staff audience in the
    /// same write.
    pub async fn create(
        &self,
        claims: &Claims,
        request_type: &str,
        message: &str,
    ) -> Result<Uuid, WorkflowError> {
        let request_type = request_type.trim();
        let message = message.trim();
        if request_type.is_empty() || message.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "Request type and message are required".to_string(),
            ));
        }

        let profile = self
            .store
            .get_profile(&claims.subject)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Requester profile not found".to_string()))?;

        // The stored profile decides who may request, not the token
        let requester_role = match profile.role() {
            Some(role) if self.policy.requester_roles.contains(&role) => role,
            _ => {
                warn!(
                    "Request creation denied for {} with profile role '{}'",
                    claims.subject, profile.role
                );
                return Err(WorkflowError::Forbidden(format!(
                    "Access denied: only [{}] may create requests",
                    role_list(&self.policy.requester_roles)
                )));
            }
        };

        let now = Utc::now();
        let status = self.policy.initial_status;
        let audience = self
            .store
            .profiles_with_roles(&self.policy.new_request_audience_roles)
            .await?;

        let fan_out: Vec<NewNotification> = audience
            .into_iter()
            .map(|staff| NewNotification {
                recipient_id: staff.uid,
                request_id: None,
                message: format!("New document request from {}: {}", profile.email, request_type),
                category: NotificationCategory::Request,
                status,
                created_at: now,
            })
            .collect();
        let notified = fan_out.len();

        let created = self
            .store
            .create_request(
                NewDocumentRequest {
                    requester_id: claims.subject.clone(),
                    requester_role,
                    request_type: request_type.to_string(),
                    message: message.to_string(),
                    status,
                    created_at: now,
                },
                fan_out,
            )
            .await?;

        info!(
            "Created {} request {} for {} ({} staff notified)",
            created.request_type, created.id, claims.subject, notified
        );
        Ok(created.id)
    }

    pub async fn get(&self, id: Uuid, claims: &Claims) -> Result<DocumentRequest, WorkflowError> {
        authorize(claims, &self.policy.reader_roles, "reading requests")?;
        self.store
            .get_request(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("Request {} not found", id)))
    }

    pub async fn list_all(&self, claims: &Claims) -> Result<Vec<DocumentRequest>, WorkflowError> {
        authorize(claims, &self.policy.reader_roles, "listing requests")?;
        Ok(self.store.list_requests().await?)
    }

    pub async fn list_mine(&self, claims: &Claims) -> Result<Vec<DocumentRequest>, WorkflowError> {
        Ok(self.store.list_requests_by_requester(&claims.subject).await?)
    }

    /// Overwrite the status and notify the requester. Same-value
    /// transitions are accepted and still notify.
    pub async fn update_status(
        &self,
        id: Uuid,
        new_status: &str,
        claims: &Claims,
    ) -> Result<(), WorkflowError> {
        authorize(claims, &self.policy.transitioner_roles, "updating request status")?;

        let status = new_status
            .parse::<RequestStatus>()
            .ok()
            .filter(|s| self.policy.assignable_statuses.contains(s))
            .ok_or_else(|| WorkflowError::InvalidInput(format!("Invalid status '{}'", new_status)))?;

        let request = self
            .store
            .get_request(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("Request {} not found", id)))?;

        let notification = NewNotification {
            recipient_id: request.requester_id.clone(),
            request_id: Some(id),
            message: format!("Your {} request is now {}", request.request_type, status),
            category: NotificationCategory::StatusUpdate,
            status,
            created_at: Utc::now(),
        };

        if !self.store.set_status(id, status, notification).await? {
            return Err(WorkflowError::NotFound(format!("Request {} not found", id)));
        }

        info!("Request {} set to {} by {}", id, status, claims.subject);
        Ok(())
    }

    pub async fn list_notifications(&self, claims: &Claims) -> Result<Vec<Notification>, WorkflowError> {
        Ok(self.store.notifications_for(&claims.subject).await?)
    }
}
