use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{NotificationCategory, RequestStatus};

/// Immutable notification record. Only ever written as a side effect of a
/// document request lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: String,
    pub request_id: Option<Uuid>,
    pub message: String,
    pub category: NotificationCategory,
    pub status: RequestStatus,
    #[serde(with = "crate::types::timestamp", default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient_id: String,
    /// Filled in by the store when the related request is created in the same write
    pub request_id: Option<Uuid>,
    pub message: String,
    pub category: NotificationCategory,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl NewNotification {
    pub fn with_id(self, id: Uuid) -> Notification {
        Notification {
            id,
            recipient_id: self.recipient_id,
            request_id: self.request_id,
            message: self.message,
            category: self.category,
            status: self.status,
            created_at: Some(self.created_at),
        }
    }
}
