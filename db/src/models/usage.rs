use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// One billed (or failed) completion attempt. Never updated once written.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub key_id: Uuid,
    pub project_id: Option<Uuid>,
    pub billing_user_id: Uuid,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub tokens_input: i64,
    pub tokens_output: i64,
    pub provider_cost: Decimal,
    pub markup_amount: Decimal,
    pub billed_cost: Decimal,
    pub success: bool,
    pub cached: bool,
    pub cache_hit: bool,
    pub error_type: Option<String>,
}
