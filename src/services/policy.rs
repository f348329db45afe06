use serde::{Deserialize, Serialize};

use crate::types::{RequestStatus, Role};

/// Deployment knobs for the request workflow. The two known deployments
/// disagree on initial status and on who may transition, upload and be told
/// about new requests; both are expressed as presets of this one structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowPolicy {
    /// Status written on every new request
    pub initial_status: RequestStatus,
    /// Profile roles allowed to create requests
    pub requester_roles: Vec<Role>,
    /// Claim roles allowed to read any request (Get, ListAll)
    pub reader_roles: Vec<Role>,
    /// Claim roles allowed to change a request's status
    pub transitioner_roles: Vec<Role>,
    /// Claim roles allowed to upload documents
    pub uploader_roles: Vec<Role>,
    /// Profile roles notified when a request is created
    pub new_request_audience_roles: Vec<Role>,
    /// Statuses accepted by UpdateStatus
    pub assignable_statuses: Vec<RequestStatus>,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self::admin_desk()
    }
}

impl WorkflowPolicy {
    /// Requests start in progress, admins are told about new ones, and any
    /// staff member may transition or upload.
    pub fn admin_desk() -> Self {
        Self {
            initial_status: RequestStatus::InProgress,
            requester_roles: vec![Role::Student, Role::Parent, Role::Personnel],
            reader_roles: vec![Role::Admin, Role::Personnel],
            transitioner_roles: vec![Role::Admin, Role::Personnel],
            uploader_roles: vec![Role::Admin, Role::Personnel],
            new_request_audience_roles: vec![Role::Admin],
            assignable_statuses: vec![
                RequestStatus::InProgress,
                RequestStatus::Completed,
                RequestStatus::Rejected,
            ],
        }
    }

    /// Requests start not-started and personnel own the whole desk.
    pub fn personnel_desk() -> Self {
        Self {
            initial_status: RequestStatus::NotStarted,
            transitioner_roles: vec![Role::Personnel],
            uploader_roles: vec![Role::Personnel],
            new_request_audience_roles: vec![Role::Admin, Role::Personnel],
            ..Self::admin_desk()
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "admin-desk" => Some(Self::admin_desk()),
            "personnel-desk" => Some(Self::personnel_desk()),
            _ => None,
        }
    }
}
