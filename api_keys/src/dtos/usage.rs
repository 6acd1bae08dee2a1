use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct UsageRecordsQuery {
    pub limit: Option<i64>,
    pub ending_before: Option<DateTime<Utc>>,
    pub starting_after: Option<DateTime<Utc>>,
}
