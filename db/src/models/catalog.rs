use rust_decimal::Decimal;
use serde::Serialize;

/// Upstream model and its provider prices, per million tokens.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ModelConfig {
    pub id: String,
    pub provider: String,
    pub input_price_per_million: Decimal,
    pub output_price_per_million: Decimal,
    pub active: bool,
}
