/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles carried by identity claims and profile records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Role {
    Admin,
    Personnel,
    Student,
    Parent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Personnel => "personnel",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }

    /// Every stored spelling that parses to this role, lowercased
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            Role::Admin => &["admin"],
            Role::Personnel => &["personnel"],
            Role::Student => &["student", "étudiant", "etudiant"],
            Role::Parent => &["parent"],
        }
    }

    /// Lenient parse used for profile records, where the role is free text.
    pub fn parse_lenient(value: Option<&str>) -> Option<Role> {
        value.and_then(|v| v.parse().ok())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "personnel" => Ok(Role::Personnel),
            "student" | "étudiant" | "etudiant" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

// Deserialization goes through FromStr so policy files accept every spelling
// the environment overrides do
impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Lifecycle status of a document request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    NotStarted,
    #[serde(alias = "en cours")]
    InProgress,
    Completed,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::NotStarted => "not-started",
            RequestStatus::InProgress => "in-progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "not-started" => Ok(RequestStatus::NotStarted),
            "in-progress" | "en cours" => Ok(RequestStatus::InProgress),
            "completed" => Ok(RequestStatus::Completed),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// What kind of lifecycle event produced a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationCategory {
    Request,
    StatusUpdate,
    DocumentUploaded,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Request => "Request",
            NotificationCategory::StatusUpdate => "StatusUpdate",
            NotificationCategory::DocumentUploaded => "DocumentUploaded",
        }
    }
}

impl FromStr for NotificationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Request" => Ok(NotificationCategory::Request),
            "StatusUpdate" => Ok(NotificationCategory::StatusUpdate),
            "DocumentUploaded" => Ok(NotificationCategory::DocumentUploaded),
            other => Err(format!("unknown notification category '{}'", other)),
        }
    }
}

/// Canonical timestamp rendering: ISO-8601 UTC with millisecond precision.
/// Absent timestamps serialize as `null`.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn render(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => serializer.serialize_str(&render(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<DateTime<Utc>>::deserialize(deserializer)
    }
}
