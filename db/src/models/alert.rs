use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

pub const BUDGET_ALERT: &str = "budget";

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Alert {
    pub id: Uuid,
    pub project_id: Uuid,
    pub alert_type: String,
    /// First day of the calendar month the alert belongs to.
    pub period: NaiveDate,
    pub message: String,
    pub percent_used: Decimal,
    pub created_at: DateTime<Utc>,
}
