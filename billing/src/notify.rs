//! Budget alert delivery. Every sink is best-effort.

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{
    env_config::{AlertConfig, EmailRelayConfig},
    error::Res,
};
use log::{info, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct BudgetNotice {
    pub project_id: Uuid,
    pub project_name: String,
    pub period: NaiveDate,
    pub current_spend: Decimal,
    pub spending_limit: Decimal,
    pub percent_used: Decimal,
    pub message: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify(&self, notice: &BudgetNotice) -> Res<()>;
}

/// POSTs the notice as JSON to a configured URL.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        WebhookNotifier {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, notice: &BudgetNotice) -> Res<()> {
        self.client
            .post(&self.url)
            .json(&json!({ "type": "budget_alert", "data": notice }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Sends the notice through an HTTP mail relay.
pub struct EmailNotifier {
    client: Client,
    config: EmailRelayConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailRelayConfig) -> Self {
        EmailNotifier {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn notify(&self, notice: &BudgetNotice) -> Res<()> {
        let subject = format!(
            "Budget alert: {} has used {}% of its limit",
            notice.project_name,
            notice.percent_used.round_dp(1)
        );

        self.client
            .post(&self.config.relay_url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "from": self.config.from,
                "to": self.config.to,
                "subject": subject,
                "text": notice.message,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[derive(Default)]
pub struct Notifiers {
    sinks: Vec<Box<dyn Notifier>>,
}

impl Notifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AlertConfig) -> Self {
        let mut notifiers = Notifiers::new();
        if let Some(url) = &config.webhook_url {
            notifiers.push(WebhookNotifier::new(url.clone()));
        }
        if let Some(email) = &config.email {
            notifiers.push(EmailNotifier::new(email.clone()));
        }
        notifiers
    }

    pub fn push(&mut self, notifier: impl Notifier + 'static) {
        self.sinks.push(Box::new(notifier));
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Hands the notice to every sink and returns how many accepted it.
    pub async fn notify_all(&self, notice: &BudgetNotice) -> usize {
        let results =
            futures::future::join_all(self.sinks.iter().map(|sink| sink.notify(notice))).await;

        let mut delivered = 0;
        for (sink, result) in self.sinks.iter().zip(results) {
            match result {
                Ok(()) => {
                    info!("Budget alert for project {} sent via {}", notice.project_id, sink.name());
                    delivered += 1;
                }
                Err(e) => warn!(
                    "Budget alert for project {} not sent via {}: {}",
                    notice.project_id,
                    sink.name(),
                    e
                ),
            }
        }
        delivered
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use common::error::AppError;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    /// Remembers every notice it is handed.
    #[derive(Clone, Default)]
    pub struct Recorder(pub Arc<Mutex<Vec<BudgetNotice>>>);

    #[async_trait]
    impl Notifier for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn notify(&self, notice: &BudgetNotice) -> Res<()> {
            self.0.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    pub struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn notify(&self, _notice: &BudgetNotice) -> Res<()> {
            Err(AppError::Internal("smtp down".to_string()))
        }
    }

    fn notice() -> BudgetNotice {
        BudgetNotice {
            project_id: Uuid::new_v4(),
            project_name: "acme".to_string(),
            period: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            current_spend: dec!(85),
            spending_limit: dec!(100),
            percent_used: dec!(85),
            message: "acme has used 85% of its monthly budget".to_string(),
        }
    }

    #[actix_web::test]
    async fn failing_sink_does_not_stop_the_others() {
        let recorder = Recorder::default();
        let mut notifiers = Notifiers::new();
        notifiers.push(Failing);
        notifiers.push(recorder.clone());

        let delivered = notifiers.notify_all(&notice()).await;

        assert_eq!(delivered, 1);
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn only_configured_sinks_are_built() {
        assert!(Notifiers::from_config(&AlertConfig::default()).is_empty());

        let config = AlertConfig {
            webhook_url: Some("http://localhost:9/hook".to_string()),
            email: None,
        };
        let notifiers = Notifiers::from_config(&config);
        assert_eq!(notifiers.sinks.len(), 1);
        assert_eq!(notifiers.sinks[0].name(), "webhook");
    }
}
