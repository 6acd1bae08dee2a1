use chrono::{DateTime, Utc};
use sqlx::types::{JsonValue, ipnetwork::IpNetwork};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub reason: Option<String>,
    pub user_id: Option<Uuid>,
    pub key_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub ip_address: Option<IpNetwork>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub metadata: JsonValue,
}
