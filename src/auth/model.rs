use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

/// Roles a user can hold. Stored role names are matched case-insensitively,
/// with or without the `ROLE_` authority prefix.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Student,
    Guest,
}

/// Fine-grained privileges derived from a role.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewBooks,
    ManageBooks,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Student, Role::Guest];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Student => "STUDENT",
            Role::Guest => "GUEST",
        }
    }

    /// Granted authority string, e.g. `ROLE_ADMIN`.
    #[must_use]
    pub fn authority(self) -> String {
        format!("ROLE_{}", self.as_str())
    }

    #[must_use]
    pub const fn permissions(self) -> &'static [Permission] {
        match self {
            Role::Admin => &[Permission::ViewBooks, Permission::ManageBooks],
            Role::Student => &[Permission::ViewBooks],
            Role::Guest => &[],
        }
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
        let upper = s.trim().to_uppercase();
        let name = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == name)
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// Authenticated identity. Only [`crate::auth::Authenticator`] creates one, and it
/// never carries the password or its hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    identity: String,
    role: Role,
}

impl Principal {
    pub(crate) fn new(identity: String, role: Role) -> Self {
        Self { identity, role }
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn authorities(&self) -> Vec<String> {
        vec![self.role.authority()]
    }

    #[must_use]
    pub fn permissions(&self) -> &'static [Permission] {
        self.role.permissions()
    }

    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

/// A persisted user as seen by the authenticator.
///
/// `role` is the raw role name from storage; it is optional here only so that a
/// broken reference can be detected and reported instead of silently dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub identity: String,
    pub password_hash: String,
    pub role: Option<String>,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("identity", &self.identity)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}
