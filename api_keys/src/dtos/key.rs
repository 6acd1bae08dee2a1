use chrono::{DateTime, Utc};
use db::models::key::ApiKey;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub name: String,
    pub project_id: Option<Uuid>,
    pub expires: Option<DateTime<Utc>>,
    pub daily_usage_limit: Option<Decimal>,
    pub monthly_usage_limit: Option<Decimal>,
    pub total_usage_limit: Option<Decimal>,
}

/// The raw key is only ever returned here.
#[derive(Debug, Serialize)]
pub struct CreateKeyResponse {
    pub key: String,
    #[serde(flatten)]
    pub record: ApiKey,
}

/// Absent fields are left alone; an explicit `null` clears a nullable field.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateKeyRequest {
    pub name: Option<String>,
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub expires: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub daily_usage_limit: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub monthly_usage_limit: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub total_usage_limit: Option<Option<Decimal>>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
