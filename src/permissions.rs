use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

/// Role
///
/// The RBAC tier attached to every user identity. Loaded once per session and
/// never mutated while a page is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

/// Permission
///
/// The set of actions a role may perform on a page.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Permission {
    Create,
    Edit,
    Delete,
    View,
}

// The single source of truth for gating. ADMIN ⊇ EDITOR ⊇ VIEWER.
const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::Create,
    Permission::Edit,
    Permission::Delete,
    Permission::View,
];
const EDITOR_PERMISSIONS: &[Permission] = &[Permission::Create, Permission::Edit, Permission::View];
const VIEWER_PERMISSIONS: &[Permission] = &[Permission::View];

/// permissions_for
///
/// Maps a role to its static permission set. Total and side-effect free.
pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::Admin => ADMIN_PERMISSIONS,
        Role::Editor => EDITOR_PERMISSIONS,
        Role::Viewer => VIEWER_PERMISSIONS,
    }
}

pub fn has_permission(role: Role, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}

/// require_permission
///
/// Guard used at authorization boundaries (persistence adapter, builder session).
pub fn require_permission(role: Role, permission: Permission) -> Result<(), PermissionDenied> {
    if has_permission(role, permission) {
        Ok(())
    } else {
        Err(PermissionDenied { role, permission })
    }
}

/// PermissionDenied
///
/// Raised when a role attempts an action outside its permission set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("role {role} lacks the {permission} permission")]
pub struct PermissionDenied {
    pub role: Role,
    pub permission: Permission,
}

/// Capabilities
///
/// Derived booleans consumed by the builder session and the `/me` endpoint.
/// Each flag is a membership test against `permissions_for(role)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Capabilities {
    pub role: Role,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_view: bool,
}

impl Capabilities {
    pub fn for_role(role: Role) -> Self {
        Self {
            role,
            can_create: has_permission(role, Permission::Create),
            can_edit: has_permission(role, Permission::Edit),
            can_delete: has_permission(role, Permission::Delete),
            can_view: has_permission(role, Permission::View),
        }
    }

    /// Both palette insertion and reordering are enabled by this flag.
    pub fn is_draggable(&self) -> bool {
        self.can_create || self.can_edit
    }

    /// Target-user selector, palette, layout picker and save button.
    pub fn manages_pages(&self) -> bool {
        self.role != Role::Viewer
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Editor => "EDITOR",
            Role::Viewer => "VIEWER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::Create => "CREATE",
            Permission::Edit => "EDIT",
            Permission::Delete => "DELETE",
            Permission::View => "VIEW",
        };
        f.write_str(name)
    }
}

/// UnknownRole
///
/// Returned when a stored role string is outside {ADMIN, EDITOR, VIEWER}.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "EDITOR" => Ok(Role::Editor),
            "VIEWER" => Ok(Role::Viewer),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}
