//! Role-based gating of privileged operations.
//!
//! A session's role maps to a fixed capability set; each privileged operation
//! names the capability it needs and is checked once, at its entry point.

use std::collections::BTreeSet;

use crate::model::UserRole;

/// Environment variable overriding the configured session role.
pub const ROLE_ENV_VAR: &str = "EDU_JOURNAL_ROLE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    ViewJournal,
    EditJournal,
    ViewUsers,
    ManageUsers,
    ViewPosts,
    EditPosts,
    ImportExport,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewJournal => "view-journal",
            Self::EditJournal => "edit-journal",
            Self::ViewUsers => "view-users",
            Self::ManageUsers => "manage-users",
            Self::ViewPosts => "view-posts",
            Self::EditPosts => "edit-posts",
            Self::ImportExport => "import-export",
        }
    }

    /// User-facing short description.
    pub fn description(self) -> &'static str {
        match self {
            Self::ViewJournal => "Read marks, attendance and statistics.",
            Self::EditJournal => "Add students, record marks and attendance.",
            Self::ViewUsers => "Browse the user directory.",
            Self::ManageUsers => "Create, edit and delete users.",
            Self::ViewPosts => "Read posts.",
            Self::EditPosts => "Create, edit and delete posts.",
            Self::ImportExport => "Import and export CSV data.",
        }
    }

    fn verb_phrase(self) -> &'static str {
        match self {
            Self::ViewJournal => "read the journal",
            Self::EditJournal => "edit the journal",
            Self::ViewUsers => "browse users",
            Self::ManageUsers => "create, edit and delete users",
            Self::ViewPosts => "read posts",
            Self::EditPosts => "create, edit and delete posts",
            Self::ImportExport => "import or export data",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities granted to a role. Higher roles include everything below.
pub fn capabilities_for(role: UserRole) -> BTreeSet<Capability> {
    let mut caps = BTreeSet::from([
        Capability::ViewJournal,
        Capability::ViewUsers,
        Capability::ViewPosts,
    ]);
    if role >= UserRole::Teacher {
        caps.extend([
            Capability::EditJournal,
            Capability::EditPosts,
            Capability::ImportExport,
        ]);
    }
    if role >= UserRole::Admin {
        caps.insert(Capability::ManageUsers);
    }
    caps
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("role `{role}` is not allowed to {}", capability.verb_phrase())]
    Denied {
        role: UserRole,
        capability: Capability,
    },
}

/// The acting session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub role: UserRole,
}

impl Session {
    pub fn new(role: UserRole) -> Self {
        Self { role }
    }

    /// Use `EDU_JOURNAL_ROLE` when set and valid, otherwise `fallback`.
    pub fn from_env_or(fallback: UserRole) -> Self {
        let role = match std::env::var(ROLE_ENV_VAR) {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("Ignoring {ROLE_ENV_VAR}: {e}");
                fallback
            }),
            Err(_) => fallback,
        };
        Self { role }
    }

    pub fn can(&self, capability: Capability) -> bool {
        capabilities_for(self.role).contains(&capability)
    }
}

pub fn require(session: &Session, capability: Capability) -> Result<(), AccessError> {
    if session.can(capability) {
        Ok(())
    } else {
        Err(AccessError::Denied {
            role: session.role,
            capability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_students_only_view() {
        let caps = capabilities_for(UserRole::Student);
        assert_eq!(
            caps,
            BTreeSet::from([
                Capability::ViewJournal,
                Capability::ViewUsers,
                Capability::ViewPosts
            ])
        );
    }

    #[test]
    fn test_teachers_edit_but_do_not_manage_users() {
        let session = Session::new(UserRole::Teacher);
        assert!(session.can(Capability::EditJournal));
        assert!(session.can(Capability::EditPosts));
        assert!(session.can(Capability::ImportExport));
        assert!(!session.can(Capability::ManageUsers));
    }

    #[test]
    fn test_admin_has_everything() {
        let caps = capabilities_for(UserRole::Admin);
        assert_eq!(caps.len(), 7);
    }

    #[test]
    fn test_require_reports_role_and_capability() {
        let err = require(&Session::new(UserRole::Student), Capability::ManageUsers)
            .expect_err("students cannot manage users");
        assert_eq!(
            err,
            AccessError::Denied {
                role: UserRole::Student,
                capability: Capability::ManageUsers
            }
        );
        assert_eq!(
            err.to_string(),
            "role `student` is not allowed to create, edit and delete users"
        );
    }
}
