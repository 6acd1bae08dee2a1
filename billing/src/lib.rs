//! Quota and spend evaluation: billed cost, key usage status, project spend
//! banding and budget alerts.

pub mod cost;
pub mod notify;
pub mod quota;
pub mod spend;
pub mod window;

pub use cost::{BilledCost, compute_billed_cost, provider_cost};
pub use notify::{BudgetNotice, Notifier, Notifiers};
pub use quota::{
    KeyStatus, KeyUsageStatus, evaluate_key, get_key_usage_status, get_key_usage_status_at,
};
pub use spend::{
    AlertOutcome, ProjectSpendStatus, SpendBand, SpendMonitor, classify, project_spend_status,
};
pub use window::EvaluationTime;
