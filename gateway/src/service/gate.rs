//! Admission of completion requests: key resolution, quota evaluation,
//! payload validation, model lookup, execution and ledger write.

use std::sync::Arc;

use api_keys::{ResolveError, resolve_key};
use billing::{
    AlertOutcome, BilledCost, EvaluationTime, KeyStatus, SpendMonitor, compute_billed_cost,
    evaluate_key, provider_cost,
};
use chrono::Utc;
use common::error::{AppError, Res};
use db::{
    Store,
    dtos::usage::NewUsageRecord,
    models::{catalog::ModelConfig, key::ApiKey},
};
use logger::{AuditAction, AuditEvent, Auditor, RejectReason, RequestOrigin};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::{
    dtos::completion::{
        ChatCompletionBody, ChatCompletionResponse, ChatMessage, Choice, CompletionRequest,
        TokenUsage,
    },
    error::GatewayError,
    provider::{Completion, CompletionProvider},
};

#[derive(Clone)]
pub struct AdmissionGate {
    store: Arc<dyn Store>,
    provider: Arc<dyn CompletionProvider>,
    auditor: Arc<Auditor>,
    spend_monitor: Option<Arc<SpendMonitor>>,
    markup_percent: Decimal,
}

impl AdmissionGate {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn CompletionProvider>,
        auditor: Arc<Auditor>,
        markup_percent: Decimal,
    ) -> Self {
        AdmissionGate {
            store,
            provider,
            auditor,
            spend_monitor: None,
            markup_percent,
        }
    }

    /// Re-checks the project budget after each ledger write of a project key.
    pub fn with_spend_monitor(mut self, monitor: Arc<SpendMonitor>) -> Self {
        self.spend_monitor = Some(monitor);
        self
    }

    pub async fn handle(
        &self,
        raw_key: Option<&str>,
        body: &[u8],
        origin: &RequestOrigin,
    ) -> Result<ChatCompletionResponse, GatewayError> {
        self.handle_at(raw_key, body, origin, EvaluationTime::now())
            .await
    }

    /// Every branch records exactly one audit entry. Only requests that
    /// reach the provider write a usage record.
    pub async fn handle_at(
        &self,
        raw_key: Option<&str>,
        body: &[u8],
        origin: &RequestOrigin,
        at: EvaluationTime,
    ) -> Result<ChatCompletionResponse, GatewayError> {
        let key = match resolve_key(&*self.store, raw_key).await {
            Ok(key) => key,
            Err(e) => {
                let message = e.to_string();
                let (reason, error) = match e {
                    ResolveError::Missing => (
                        RejectReason::MissingKey,
                        GatewayError::Authentication {
                            message,
                            code: "missing_api_key",
                        },
                    ),
                    ResolveError::Invalid => (
                        RejectReason::InvalidKey,
                        GatewayError::Authentication {
                            message,
                            code: "invalid_api_key",
                        },
                    ),
                    ResolveError::Revoked => (
                        RejectReason::RevokedKey,
                        GatewayError::Authentication {
                            message,
                            code: "revoked_api_key",
                        },
                    ),
                    ResolveError::Store(e) => {
                        (RejectReason::InternalError, GatewayError::Internal(e))
                    }
                };
                return Err(self.reject(None, reason, error, origin).await);
            }
        };

        let status = match evaluate_key(&*self.store, &key, at).await {
            Ok(status) => status,
            Err(e) => {
                return Err(self
                    .reject(Some(&key), RejectReason::InternalError, e.into(), origin)
                    .await);
            }
        };
        let blocked = match status.status {
            KeyStatus::Ok => None,
            KeyStatus::LimitExceeded => Some((
                RejectReason::LimitExceeded,
                GatewayError::QuotaExceeded(format!(
                    "API key usage limit exceeded ({})",
                    status.exceeded_windows().join(", ")
                )),
            )),
            KeyStatus::Inactive => Some((
                RejectReason::KeyInactive,
                GatewayError::KeyBlocked {
                    message: "API key is inactive".to_string(),
                    code: "key_inactive",
                },
            )),
            KeyStatus::Expired => Some((
                RejectReason::KeyExpired,
                GatewayError::KeyBlocked {
                    message: "API key has expired".to_string(),
                    code: "key_expired",
                },
            )),
            KeyStatus::NotFound => Some((
                RejectReason::KeyNotFound,
                GatewayError::KeyBlocked {
                    message: "API key not found".to_string(),
                    code: "key_not_found",
                },
            )),
        };
        if let Some((reason, error)) = blocked {
            return Err(self.reject(Some(&key), reason, error, origin).await);
        }

        let request = match parse_request(body) {
            Ok(request) => request,
            Err(message) => {
                return Err(self
                    .reject(
                        Some(&key),
                        RejectReason::InvalidPayload,
                        GatewayError::InvalidRequest(message),
                        origin,
                    )
                    .await);
            }
        };

        let model = match self.store.get_model(&request.model).await {
            Ok(Some(model)) if model.active => model,
            Ok(_) => {
                return Err(self
                    .reject(
                        Some(&key),
                        RejectReason::UnknownModel,
                        GatewayError::ModelNotFound(request.model),
                        origin,
                    )
                    .await);
            }
            Err(e) => {
                return Err(self
                    .reject(Some(&key), RejectReason::InternalError, e.into(), origin)
                    .await);
            }
        };

        let billing_user_id = match self.billing_user(&key).await {
            Ok(user_id) => user_id,
            Err(e) => {
                return Err(self
                    .reject(Some(&key), RejectReason::InternalError, e.into(), origin)
                    .await);
            }
        };

        // The call and its ledger write run detached from the request so a
        // client disconnect cannot drop a billable record.
        let gate = self.clone();
        let origin = origin.clone();
        actix_web::rt::spawn(async move {
            gate.execute(key, model, request, billing_user_id, &origin)
                .await
        })
        .await
        .map_err(|e| {
            GatewayError::Internal(AppError::Internal(format!("Completion task failed: {}", e)))
        })?
    }

    async fn execute(
        &self,
        key: ApiKey,
        model: ModelConfig,
        request: CompletionRequest,
        billing_user_id: Uuid,
        origin: &RequestOrigin,
    ) -> Result<ChatCompletionResponse, GatewayError> {
        let result = self.provider.complete(&model, &request).await;

        let (record, cost) = match &result {
            Ok(completion) => {
                let cost = compute_billed_cost(
                    provider_cost(&model, completion.tokens_input, completion.tokens_output),
                    self.markup_percent,
                );
                let record = usage_record(&key, billing_user_id, &model, Some(completion), cost, None);
                (record, cost)
            }
            Err(failure) => {
                let cost = BilledCost::zero();
                let record =
                    usage_record(&key, billing_user_id, &model, None, cost, Some(failure.kind()));
                (record, cost)
            }
        };

        let ledger = self.store.append_usage(record).await;
        if let Err(e) = self.store.touch_key(key.id, Utc::now()).await {
            log::warn!("Failed to stamp last use of key {}: {}", key.id, e);
        }

        let event = AuditEvent::new(AuditAction::CompletionSucceeded)
            .user(key.user_id)
            .key(key.id)
            .project(key.project_id);

        let ledger_record = match ledger {
            Ok(record) => record,
            Err(e) => {
                log::error!("Usage of key {} could not be recorded: {}", key.id, e);
                self.auditor
                    .record(
                        event
                            .reason(RejectReason::InternalError)
                            .metadata(json!({ "model": model.id }))
                            .failed(),
                        origin,
                    )
                    .await;
                return Err(GatewayError::Internal(e));
            }
        };
        self.spawn_budget_check(key.project_id);

        match result {
            Ok(completion) => {
                self.auditor
                    .record(
                        event.metadata(json!({
                            "model": model.id,
                            "usage_record_id": ledger_record.id,
                            "billing_user_id": billing_user_id,
                            "tokens_input": completion.tokens_input,
                            "tokens_output": completion.tokens_output,
                            "billed_cost": cost.billed_cost,
                        })),
                        origin,
                    )
                    .await;
                Ok(completion_response(&model, completion, cost))
            }
            Err(failure) => {
                log::warn!("Completion for key {} failed: {}", key.id, failure.kind());
                self.auditor
                    .record(
                        event
                            .reason(RejectReason::ProviderError)
                            .metadata(json!({
                                "model": model.id,
                                "usage_record_id": ledger_record.id,
                                "error_type": failure.kind(),
                            }))
                            .failed(),
                        origin,
                    )
                    .await;
                Err(GatewayError::Provider(failure))
            }
        }
    }

    /// Project keys bill the project owner, personal keys their owner.
    async fn billing_user(&self, key: &ApiKey) -> Res<Uuid> {
        let Some(project_id) = key.project_id else {
            return Ok(key.user_id);
        };
        match self.store.get_project(project_id).await? {
            Some(project) => Ok(project.owner_id),
            None => {
                log::warn!(
                    "Project {} of key {} no longer exists, billing the key owner",
                    project_id,
                    key.id
                );
                Ok(key.user_id)
            }
        }
    }

    fn spawn_budget_check(&self, project_id: Option<Uuid>) {
        let (Some(monitor), Some(project_id)) = (self.spend_monitor.clone(), project_id) else {
            return;
        };
        actix_web::rt::spawn(async move {
            match monitor.check_project(project_id).await {
                Ok(AlertOutcome::Created(alert)) => {
                    log::info!("Budget alert {} created for project {}", alert.id, project_id)
                }
                Ok(_) => {}
                Err(e) => log::error!("Budget check for project {} failed: {}", project_id, e),
            }
        });
    }

    async fn reject(
        &self,
        key: Option<&ApiKey>,
        reason: RejectReason,
        error: GatewayError,
        origin: &RequestOrigin,
    ) -> GatewayError {
        let mut event = AuditEvent::new(AuditAction::CompletionRejected)
            .reason(reason)
            .metadata(json!({ "type": error.kind(), "message": error.to_string() }));
        if let Some(key) = key {
            event = event.user(key.user_id).key(key.id).project(key.project_id);
        }
        self.auditor.record(event, origin).await;
        error
    }
}

/// Validates the completion payload: a model id and at least one message.
pub fn parse_request(body: &[u8]) -> Result<CompletionRequest, String> {
    let body: ChatCompletionBody =
        serde_json::from_slice(body).map_err(|e| format!("Invalid JSON body: {}", e))?;

    let model = body
        .model
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or("'model' is required")?;
    let messages = body
        .messages
        .filter(|m| !m.is_empty())
        .ok_or("'messages' must contain at least one message")?;
    if body.max_tokens == Some(0) {
        return Err("'max_tokens' must be at least 1".to_string());
    }

    Ok(CompletionRequest {
        model,
        messages,
        max_tokens: body.max_tokens,
    })
}

fn usage_record(
    key: &ApiKey,
    billing_user_id: Uuid,
    model: &ModelConfig,
    completion: Option<&Completion>,
    cost: BilledCost,
    error_type: Option<&str>,
) -> NewUsageRecord {
    let tokens = |n: u64| i64::try_from(n).unwrap_or(i64::MAX);
    NewUsageRecord {
        key_id: key.id,
        project_id: key.project_id,
        billing_user_id,
        model: model.id.clone(),
        timestamp: Utc::now(),
        tokens_input: completion.map_or(0, |c| tokens(c.tokens_input)),
        tokens_output: completion.map_or(0, |c| tokens(c.tokens_output)),
        provider_cost: cost.provider_cost,
        markup_amount: cost.markup_amount,
        billed_cost: cost.billed_cost,
        success: completion.is_some(),
        cached: false,
        cache_hit: false,
        error_type: error_type.map(str::to_string),
    }
}

fn completion_response(
    model: &ModelConfig,
    completion: Completion,
    cost: BilledCost,
) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: format!("chatcmpl-{}", Uuid::new_v4().simple()),
        object: "chat.completion",
        created: Utc::now().timestamp(),
        model: model.id.clone(),
        choices: vec![Choice {
            index: 0,
            message: ChatMessage {
                role: "assistant".to_string(),
                content: completion.content,
            },
            finish_reason: completion.finish_reason,
        }],
        usage: TokenUsage {
            prompt_tokens: completion.tokens_input,
            completion_tokens: completion.tokens_output,
            total_tokens: completion.tokens_input + completion.tokens_output,
        },
        billing: cost,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::provider::ProviderFailure;
    use actix_web::ResponseError;
    use async_trait::async_trait;
    use common::key::{KeyClaims, hash_secret};
    use db::{
        KeyStore, MemoryStore, UsageLedger,
        dtos::key::{KeyCreateRequest, KeyUpdateRequest},
        models::{key::ApiKeyLimits, project::Project},
    };
    use rust_decimal_macros::dec;

    /// Answers every call with the same outcome.
    pub struct ScriptedProvider(pub Result<Completion, ProviderFailure>);

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(
            &self,
            _model: &ModelConfig,
            _request: &CompletionRequest,
        ) -> Result<Completion, ProviderFailure> {
            self.0.clone()
        }
    }

    pub fn answer() -> Result<Completion, ProviderFailure> {
        Ok(Completion {
            content: "Paris.".to_string(),
            tokens_input: 1000,
            tokens_output: 500,
            finish_reason: "stop",
        })
    }

    pub const BODY: &[u8] =
        br#"{"model":"gpt-4o-mini","messages":[{"role":"user","content":"Capital of France?"}]}"#;

    pub async fn setup(
        outcome: Result<Completion, ProviderFailure>,
    ) -> (Arc<MemoryStore>, AdmissionGate) {
        let store = Arc::new(MemoryStore::new());
        store
            .add_model(ModelConfig {
                id: "gpt-4o-mini".to_string(),
                provider: "openai".to_string(),
                input_price_per_million: dec!(1.00),
                output_price_per_million: dec!(2.00),
                active: true,
            })
            .await;
        let gate = AdmissionGate::new(
            store.clone(),
            Arc::new(ScriptedProvider(outcome)),
            Arc::new(Auditor::new(store.clone(), None)),
            dec!(20),
        );
        (store, gate)
    }

    pub async fn issue_key(
        store: &MemoryStore,
        limits: ApiKeyLimits,
        project_id: Option<Uuid>,
    ) -> (ApiKey, String) {
        let claims = KeyClaims::generate(Uuid::new_v4());
        let key = store
            .insert_key(KeyCreateRequest {
                id: claims.key_id,
                user_id: Uuid::new_v4(),
                project_id,
                name: "test".to_string(),
                key_hash: hash_secret(&claims.secret).unwrap(),
                expires: None,
                daily_usage_limit: limits.daily_usage_limit,
                monthly_usage_limit: limits.monthly_usage_limit,
                total_usage_limit: limits.total_usage_limit,
            })
            .await
            .unwrap();
        (key, claims.to_key())
    }

    async fn past_spend(store: &MemoryStore, key: &ApiKey, billed: Decimal) {
        store
            .append_usage(NewUsageRecord {
                key_id: key.id,
                project_id: key.project_id,
                billing_user_id: key.user_id,
                model: "gpt-4o-mini".to_string(),
                timestamp: Utc::now(),
                tokens_input: 1,
                tokens_output: 1,
                provider_cost: billed,
                markup_amount: Decimal::ZERO,
                billed_cost: billed,
                success: true,
                cached: false,
                cache_hit: false,
                error_type: None,
            })
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn admitted_request_is_billed_with_markup() {
        let (store, gate) = setup(answer()).await;
        let (key, raw) = issue_key(&store, ApiKeyLimits::default(), None).await;

        let response = gate
            .handle(Some(raw.as_str()), BODY, &RequestOrigin::default())
            .await
            .unwrap();

        // 1000 * 1.00 / 1e6 + 500 * 2.00 / 1e6 = 0.002, plus 20%
        assert_eq!(response.billing.provider_cost, dec!(0.002));
        assert_eq!(response.billing.billed_cost, dec!(0.0024));
        assert_eq!(response.usage.total_tokens, 1500);
        assert_eq!(response.choices[0].message.content, "Paris.");

        let records = store.usage_records().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].success);
        assert_eq!(records[0].billed_cost, dec!(0.0024));
        assert_eq!(records[0].markup_amount, dec!(0.0004));
        assert_eq!(records[0].billing_user_id, key.user_id);

        let audit = store.audit_entries().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "completion_succeeded");
        assert_eq!(audit[0].reason, None);

        let touched = store.get_key(key.id).await.unwrap().unwrap();
        assert!(touched.last_used.is_some());
    }

    #[actix_web::test]
    async fn monthly_limit_reached_is_rejected_with_429() {
        let (store, gate) = setup(answer()).await;
        let (key, raw) = issue_key(
            &store,
            ApiKeyLimits {
                monthly_usage_limit: Some(dec!(5.00)),
                ..Default::default()
            },
            None,
        )
        .await;
        for _ in 0..3 {
            past_spend(&store, &key, dec!(2)).await;
        }

        let error = gate
            .handle(Some(raw.as_str()), BODY, &RequestOrigin::default())
            .await
            .unwrap_err();

        assert_eq!(error.status_code().as_u16(), 429);
        assert_eq!(error.kind(), "quota_exceeded");
        assert!(error.to_string().contains("usage limit exceeded"));
        assert!(error.to_string().contains("monthly"));

        assert_eq!(store.usage_records().await.len(), 3);
        let audit = store.audit_entries().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "completion_rejected");
        assert_eq!(audit[0].reason.as_deref(), Some("limit_exceeded"));
        assert_eq!(audit[0].key_id, Some(key.id));
    }

    #[actix_web::test]
    async fn provider_failure_writes_a_zero_cost_record() {
        let (store, gate) = setup(Err(ProviderFailure::Overloaded)).await;
        let (_, raw) = issue_key(&store, ApiKeyLimits::default(), None).await;

        let error = gate
            .handle(Some(raw.as_str()), BODY, &RequestOrigin::default())
            .await
            .unwrap_err();

        assert!(matches!(error, GatewayError::Provider(ProviderFailure::Overloaded)));
        assert_eq!(error.status_code().as_u16(), 529);

        let records = store.usage_records().await;
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
        assert_eq!(records[0].billed_cost, Decimal::ZERO);
        assert_eq!(records[0].error_type.as_deref(), Some("overloaded_error"));

        let audit = store.audit_entries().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "completion_failed");
        assert_eq!(audit[0].reason.as_deref(), Some("provider_error"));
    }

    #[actix_web::test]
    async fn early_rejections_write_no_usage() {
        let (store, gate) = setup(answer()).await;
        let (_, raw) = issue_key(&store, ApiKeyLimits::default(), None).await;

        let cases: [(Option<&str>, &[u8], u16, &str); 5] = [
            (None, BODY, 401, "missing_key"),
            (Some("sk_bogus"), BODY, 401, "invalid_key"),
            (Some(raw.as_str()), br#"{"model":"gpt-4o-mini","messages":[]}"#, 400, "invalid_payload"),
            (Some(raw.as_str()), br#"not json"#, 400, "invalid_payload"),
            (
                Some(raw.as_str()),
                br#"{"model":"gpt-5-ultra","messages":[{"role":"user","content":"hi"}]}"#,
                404,
                "unknown_model",
            ),
        ];

        for (i, (key, body, status, reason)) in cases.into_iter().enumerate() {
            let error = gate
                .handle(key, body, &RequestOrigin::default())
                .await
                .unwrap_err();
            assert_eq!(error.status_code().as_u16(), status, "{reason}");

            let audit = store.audit_entries().await;
            assert_eq!(audit.len(), i + 1);
            assert_eq!(audit[i].action, "completion_rejected");
            assert_eq!(audit[i].reason.as_deref(), Some(reason));
        }
        assert!(store.usage_records().await.is_empty());
    }

    #[actix_web::test]
    async fn inactive_and_revoked_keys_are_turned_away() {
        let (store, gate) = setup(answer()).await;
        let (inactive, inactive_raw) = issue_key(&store, ApiKeyLimits::default(), None).await;
        store
            .update_key(
                inactive.id,
                KeyUpdateRequest {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let (revoked, revoked_raw) = issue_key(&store, ApiKeyLimits::default(), None).await;
        store.revoke_key(revoked.id, Utc::now()).await.unwrap();

        let error = gate
            .handle(Some(inactive_raw.as_str()), BODY, &RequestOrigin::default())
            .await
            .unwrap_err();
        assert_eq!(error.status_code().as_u16(), 403);
        assert_eq!(error.kind(), "authentication_error");

        let error = gate
            .handle(Some(revoked_raw.as_str()), BODY, &RequestOrigin::default())
            .await
            .unwrap_err();
        assert_eq!(error.status_code().as_u16(), 401);
        assert_eq!(error.code(), Some("revoked_api_key"));

        assert!(store.usage_records().await.is_empty());
    }

    #[actix_web::test]
    async fn ledger_outage_is_an_internal_error() {
        let (store, gate) = setup(answer()).await;
        let (_, raw) = issue_key(&store, ApiKeyLimits::default(), None).await;
        store.fail_usage_reads(true).await;

        let error = gate
            .handle(Some(raw.as_str()), BODY, &RequestOrigin::default())
            .await
            .unwrap_err();

        assert!(matches!(error, GatewayError::Internal(_)));
        assert_eq!(error.to_string(), "Internal server error");
        assert_eq!(
            store.audit_entries().await[0].reason.as_deref(),
            Some("internal_error")
        );
    }

    #[actix_web::test]
    async fn project_key_bills_the_project_owner() {
        let (store, gate) = setup(answer()).await;
        let owner = Uuid::new_v4();
        let project = Project {
            id: Uuid::new_v4(),
            name: "acme".to_string(),
            owner_id: owner,
            spending_limit: None,
            created_at: Utc::now(),
        };
        store.add_project(project.clone()).await;
        let (key, raw) = issue_key(&store, ApiKeyLimits::default(), Some(project.id)).await;

        gate.handle(Some(raw.as_str()), BODY, &RequestOrigin::default())
            .await
            .unwrap();

        let records = store.usage_records().await;
        assert_eq!(records[0].billing_user_id, owner);
        assert_ne!(records[0].billing_user_id, key.user_id);
        assert_eq!(records[0].project_id, Some(project.id));
    }

    #[actix_web::test]
    async fn project_budget_alert_fires_once_from_admitted_calls() {
        let (store, gate) = setup(answer()).await;
        let monitor = SpendMonitor::new(
            store.clone(),
            billing::Notifiers::new(),
            Arc::new(Auditor::new(store.clone(), None)),
        );
        let gate = gate.with_spend_monitor(Arc::new(monitor));
        let project = Project {
            id: Uuid::new_v4(),
            name: "acme".to_string(),
            owner_id: Uuid::new_v4(),
            spending_limit: Some(dec!(0.003)),
            created_at: Utc::now(),
        };
        store.add_project(project.clone()).await;
        let (_, raw) = issue_key(&store, ApiKeyLimits::default(), Some(project.id)).await;

        // 0.0024 then 0.0048 against 0.003: 80% then 160%
        for _ in 0..2 {
            gate.handle(Some(raw.as_str()), BODY, &RequestOrigin::default())
                .await
                .unwrap();
        }

        // budget checks run detached from the request
        for _ in 0..100 {
            if !store.alerts().await.is_empty() {
                break;
            }
            actix_web::rt::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        actix_web::rt::time::sleep(std::time::Duration::from_millis(50)).await;

        let alerts = store.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].project_id, project.id);
        assert_eq!(alerts[0].alert_type, "budget");
        assert_eq!(store.usage_records().await.len(), 2);

        let triggered = store
            .audit_entries()
            .await
            .into_iter()
            .filter(|e| e.action == "budget_alert_triggered")
            .count();
        assert_eq!(triggered, 1);
    }

    #[test]
    fn payload_validation() {
        assert!(parse_request(BODY).is_ok());
        assert!(parse_request(br#"{"messages":[{"role":"user","content":"hi"}]}"#).is_err());
        assert!(parse_request(br#"{"model":"  ","messages":[{"role":"user","content":"hi"}]}"#).is_err());
        assert!(
            parse_request(
                br#"{"model":"m","messages":[{"role":"user","content":"hi"}],"max_tokens":0}"#
            )
            .is_err()
        );
    }
}
