use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{RequestStatus, Role};

/// A document request as persisted by the request store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    pub id: Uuid,
    pub requester_id: String,
    pub requester_role: Role,
    #[serde(rename = "type")]
    pub request_type: String,
    pub message: String,
    pub status: RequestStatus,
    #[serde(with = "crate::types::timestamp", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewDocumentRequest {
    pub requester_id: String,
    pub requester_role: Role,
    pub request_type: String,
    pub message: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl NewDocumentRequest {
    pub fn with_id(self, id: Uuid) -> DocumentRequest {
        DocumentRequest {
            id,
            requester_id: self.requester_id,
            requester_role: self.requester_role,
            request_type: self.request_type,
            message: self.message,
            status: self.status,
            created_at: Some(self.created_at),
        }
    }
}
