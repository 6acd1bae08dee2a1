use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub name: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub active: bool,
    pub expires: Option<DateTime<Utc>>,
    pub daily_usage_limit: Option<Decimal>,
    pub monthly_usage_limit: Option<Decimal>,
    pub total_usage_limit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Spend limits of a key; `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ApiKeyLimits {
    pub daily_usage_limit: Option<Decimal>,
    pub monthly_usage_limit: Option<Decimal>,
    pub total_usage_limit: Option<Decimal>,
}

impl ApiKey {
    pub fn limits(&self) -> ApiKeyLimits {
        ApiKeyLimits {
            daily_usage_limit: self.daily_usage_limit,
            monthly_usage_limit: self.monthly_usage_limit,
            total_usage_limit: self.total_usage_limit,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}
