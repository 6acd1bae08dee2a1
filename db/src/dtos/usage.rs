use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

pub struct NewUsageRecord {
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

/// What a spend aggregate is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageScope {
    Key(Uuid),
    Project(Uuid),
}

#[derive(Debug, Default, Clone)]
pub struct UsageFilter {
    pub key_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub ending_before: Option<DateTime<Utc>>,
    pub starting_after: Option<DateTime<Utc>>,
}
