use chrono::{DateTime, Utc};
use common::permission::{PermissionOverrides, Role};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub spending_limit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProjectMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub permissions: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl ProjectMember {
    /// Parsed role; `None` for values outside the known set.
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    pub fn overrides(&self) -> PermissionOverrides {
        PermissionOverrides::from_json(&self.permissions)
    }
}
