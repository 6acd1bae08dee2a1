use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

pub struct KeyCreateRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub name: String,
    pub key_hash: String,
    pub expires: Option<DateTime<Utc>>,
    pub daily_usage_limit: Option<Decimal>,
    pub monthly_usage_limit: Option<Decimal>,
    pub total_usage_limit: Option<Decimal>,
}

/// Partial update. For the nullable columns the outer `Option` says whether
/// to touch the column, the inner one is the new value.
#[derive(Debug, Default, Clone)]
pub struct KeyUpdateRequest {
    pub name: Option<String>,
    pub active: Option<bool>,
    pub expires: Option<Option<DateTime<Utc>>>,
    pub daily_usage_limit: Option<Option<Decimal>>,
    pub monthly_usage_limit: Option<Option<Decimal>>,
    pub total_usage_limit: Option<Option<Decimal>>,
}

impl KeyUpdateRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.active.is_none()
            && self.expires.is_none()
            && self.daily_usage_limit.is_none()
            && self.monthly_usage_limit.is_none()
            && self.total_usage_limit.is_none()
    }
}
