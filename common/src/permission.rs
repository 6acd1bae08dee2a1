//! Role-based project permissions with per-member overrides.

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "project:read")]
    ProjectRead,
    #[serde(rename = "project:write")]
    ProjectWrite,
    #[serde(rename = "members:manage")]
    MembersManage,
    #[serde(rename = "api-keys:read")]
    ApiKeysRead,
    #[serde(rename = "api-keys:write")]
    ApiKeysWrite,
    #[serde(rename = "usage:read")]
    UsageRead,
    #[serde(rename = "billing:read")]
    BillingRead,
    #[serde(rename = "audit:read")]
    AuditRead,
}

impl Permission {
    pub const ALL: [Permission; 8] = [
        Permission::ProjectRead,
        Permission::ProjectWrite,
        Permission::MembersManage,
        Permission::ApiKeysRead,
        Permission::ApiKeysWrite,
        Permission::UsageRead,
        Permission::BillingRead,
        Permission::AuditRead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ProjectRead => "project:read",
            Permission::ProjectWrite => "project:write",
            Permission::MembersManage => "members:manage",
            Permission::ApiKeysRead => "api-keys:read",
            Permission::ApiKeysWrite => "api-keys:write",
            Permission::UsageRead => "usage:read",
            Permission::BillingRead => "billing:read",
            Permission::AuditRead => "audit:read",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown permission '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Default grant of a role, before any per-member override.
pub fn role_has_permission(role: Role, permission: Permission) -> bool {
    use Permission::*;

    match role {
        Role::Owner | Role::Admin => true,
        Role::Member => matches!(
            permission,
            ProjectRead | ApiKeysRead | ApiKeysWrite | UsageRead
        ),
        Role::Viewer => matches!(permission, ProjectRead | ApiKeysRead | UsageRead),
    }
}

/// Explicit per-member grants and denials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionOverrides(HashMap<Permission, bool>);

impl PermissionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, permission: Permission, granted: bool) -> Self {
        self.0.insert(permission, granted);
        self
    }

    pub fn get(&self, permission: Permission) -> Option<bool> {
        self.0.get(&permission).copied()
    }

    /// Reads overrides stored as a JSON object of `"resource:action": bool`.
    /// Unknown permissions and non-boolean values are skipped.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let mut overrides = HashMap::new();
        for (name, granted) in object {
            match (name.parse::<Permission>(), granted.as_bool()) {
                (Ok(permission), Some(granted)) => {
                    overrides.insert(permission, granted);
                }
                _ => log::warn!("Ignoring permission override '{}' = {}", name, granted),
            }
        }
        Self(overrides)
    }
}

/// An explicit override wins; otherwise the role default applies.
pub fn has_permission(
    role: Role,
    overrides: &PermissionOverrides,
    permission: Permission,
) -> bool {
    overrides
        .get(permission)
        .unwrap_or_else(|| role_has_permission(role, permission))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_defaults() {
        assert!(role_has_permission(Role::Owner, Permission::AuditRead));
        assert!(role_has_permission(Role::Member, Permission::ApiKeysWrite));
        assert!(!role_has_permission(Role::Member, Permission::BillingRead));
        assert!(role_has_permission(Role::Viewer, Permission::ApiKeysRead));
        assert!(!role_has_permission(Role::Viewer, Permission::ApiKeysWrite));
    }

    #[test]
    fn override_takes_precedence_over_role() {
        let revoke = PermissionOverrides::new().with(Permission::ApiKeysRead, false);
        assert!(!has_permission(Role::Member, &revoke, Permission::ApiKeysRead));

        let grant = PermissionOverrides::new().with(Permission::BillingRead, true);
        assert!(has_permission(Role::Viewer, &grant, Permission::BillingRead));

        // untouched permissions fall back to the role
        assert!(has_permission(Role::Viewer, &grant, Permission::UsageRead));
    }

    #[test]
    fn overrides_from_json_skip_unknown_entries() {
        let overrides = PermissionOverrides::from_json(&json!({
            "api-keys:read": false,
            "billing:read": true,
            "teleport:now": true,
            "usage:read": "yes"
        }));

        assert_eq!(overrides.get(Permission::ApiKeysRead), Some(false));
        assert_eq!(overrides.get(Permission::BillingRead), Some(true));
        assert_eq!(overrides.get(Permission::UsageRead), None);
    }

    #[test]
    fn permission_names_round_trip_through_serde() {
        let value = serde_json::to_value(Permission::ApiKeysRead).unwrap();
        assert_eq!(value, json!("api-keys:read"));
        assert_eq!("api-keys:read".parse::<Permission>(), Ok(Permission::ApiKeysRead));
    }
}
