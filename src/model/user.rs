//! User directory types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::non_blank;
use super::validation::ValidationError;

/// Group assigned to users created without one.
pub const DEFAULT_GROUP: &str = "JSE-242";

/// Name assigned to users created without one.
pub const DEFAULT_USER_NAME: &str = "New user";

/// Role of a user, ordered by privilege.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "admin" => Ok(Self::Admin),
            other => Err(format!(
                "unknown role `{other}`; expected student|teacher|admin"
            )),
        }
    }
}

/// A directory entry. Client-owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub role: UserRole,
}

/// Input for creating a user. Absent fields take directory defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub group: Option<String>,
    pub role: Option<UserRole>,
}

impl NewUser {
    /// Reject a form submission whose name is present but blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) if name.trim().is_empty() => Err(ValidationError::Required("name")),
            _ => Ok(()),
        }
    }

    /// Build the user, filling defaults for absent fields.
    pub fn into_user(self, id: String) -> User {
        User {
            id,
            name: self
                .name
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
            email: non_blank(self.email),
            phone: non_blank(self.phone),
            group: Some(non_blank(self.group).unwrap_or_else(|| DEFAULT_GROUP.to_string())),
            role: self.role.unwrap_or_default(),
        }
    }
}

/// Partial update for a user. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.group.is_none()
            && self.role.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) if name.trim().is_empty() => Err(ValidationError::Required("name")),
            _ => Ok(()),
        }
    }

    /// Merge the present fields into `user`. A blank contact field clears it.
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = non_blank(Some(email.clone()));
        }
        if let Some(phone) = &self.phone {
            user.phone = non_blank(Some(phone.clone()));
        }
        if let Some(group) = &self.group {
            user.group = non_blank(Some(group.clone()));
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }
}
