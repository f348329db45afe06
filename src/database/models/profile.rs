use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::Role;

/// Account status written when an admin creates a profile
pub const INITIAL_ACCOUNT_STATUS: &str = "inactive";

/// User profile keyed by the identity provider's subject id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub uid: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Free text as stored; use [`Profile::role`] for the parsed value
    pub role: String,
    pub promotion: String,
    pub specialty: String,
    pub status: String,
    #[serde(with = "crate::types::timestamp", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn role(&self) -> Option<Role> {
        Role::parse_lenient(Some(&self.role))
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role().map(|r| roles.contains(&r)).unwrap_or(false)
    }
}

/// Editable profile fields. Absent fields are written as empty strings,
/// matching how profiles have always been stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub promotion: Option<String>,
    pub specialty: Option<String>,
}

impl ProfileFields {
    pub fn into_profile(self, uid: String, created_at: DateTime<Utc>) -> Profile {
        Profile {
            uid,
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            role: self.role.unwrap_or_default(),
            promotion: self.promotion.unwrap_or_default(),
            specialty: self.specialty.unwrap_or_default(),
            status: INITIAL_ACCOUNT_STATUS.to_string(),
            created_at: Some(created_at),
        }
    }

    /// Overwrite every editable field of `profile`, blanking absent ones
    pub fn apply_to(&self, profile: &mut Profile) {
        profile.first_name = self.first_name.clone().unwrap_or_default();
        profile.last_name = self.last_name.clone().unwrap_or_default();
        profile.email = self.email.clone().unwrap_or_default();
        profile.role = self.role.clone().unwrap_or_default();
        profile.promotion = self.promotion.clone().unwrap_or_default();
        profile.specialty = self.specialty.clone().unwrap_or_default();
    }
}
