use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

pub struct NewAlert {
    pub project_id: Uuid,
    pub alert_type: String,
    pub period: NaiveDate,
    pub message: String,
    pub percent_used: Decimal,
}
