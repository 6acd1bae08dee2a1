//! In-memory [`Store`](crate::store::Store) for tests and local development.
//! Data is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    dtos::{
        alert::NewAlert,
        audit::NewAuditEntry,
        key::{KeyCreateRequest, KeyUpdateRequest},
        usage::{NewUsageRecord, UsageFilter, UsageScope},
    },
    models::{
        alert::Alert,
        catalog::ModelConfig,
        key::ApiKey,
        project::{Project, ProjectMember},
        usage::UsageRecord,
    },
    store::{AlertStore, AuditStore, KeyStore, ModelStore, ProjectStore, UsageLedger},
    usage::page_size,
};

#[derive(Default)]
struct Inner {
    keys: HashMap<Uuid, ApiKey>,
    usage: Vec<UsageRecord>,
    projects: HashMap<Uuid, Project>,
    members: HashMap<(Uuid, Uuid), ProjectMember>,
    models: HashMap<String, ModelConfig>,
    alerts: Vec<Alert>,
    audit: Vec<NewAuditEntry>,
    fail_usage_reads: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_project(&self, project: Project) {
        self.inner.write().await.projects.insert(project.id, project);
    }

    pub async fn add_member(&self, member: ProjectMember) {
        self.inner
            .write()
            .await
            .members
            .insert((member.project_id, member.user_id), member);
    }

    pub async fn add_model(&self, model: ModelConfig) {
        self.inner.write().await.models.insert(model.id.clone(), model);
    }

    /// Makes every ledger read fail, to exercise infrastructure error paths.
    pub async fn fail_usage_reads(&self, fail: bool) {
        self.inner.write().await.fail_usage_reads = fail;
    }

    pub async fn usage_records(&self) -> Vec<UsageRecord> {
        self.inner.read().await.usage.clone()
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.inner.read().await.alerts.clone()
    }

    pub async fn audit_entries(&self) -> Vec<NewAuditEntry> {
        self.inner.read().await.audit.clone()
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn get_key(&self, key_id: Uuid) -> Res<Option<ApiKey>> {
        Ok(self.inner.read().await.keys.get(&key_id).cloned())
    }

    async fn list_keys_by_user(&self, user_id: Uuid) -> Res<Vec<ApiKey>> {
        let inner = self.inner.read().await;
        let mut keys: Vec<ApiKey> = inner
            .keys
            .values()
            .filter(|key| key.user_id == user_id)
            .cloned()
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(keys)
    }

    async fn insert_key(&self, data: KeyCreateRequest) -> Res<ApiKey> {
        let mut inner = self.inner.write().await;
        if inner.keys.contains_key(&data.id) {
            return Err(AppError::Internal(format!("Duplicate key id {}", data.id)));
        }

        let key = ApiKey {
            id: data.id,
            user_id: data.user_id,
            project_id: data.project_id,
            name: data.name,
            key_hash: data.key_hash,
            active: true,
            expires: data.expires,
            daily_usage_limit: data.daily_usage_limit,
            monthly_usage_limit: data.monthly_usage_limit,
            total_usage_limit: data.total_usage_limit,
            created_at: Utc::now(),
            last_used: None,
            revoked_at: None,
        };
        inner.keys.insert(key.id, key.clone());
        Ok(key)
    }

    async fn update_key(&self, key_id: Uuid, data: KeyUpdateRequest) -> Res<Option<ApiKey>> {
        let mut inner = self.inner.write().await;
        let Some(key) = inner.keys.get_mut(&key_id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            key.name = name;
        }
        if let Some(active) = data.active {
            key.active = active;
        }
        if let Some(expires) = data.expires {
            key.expires = expires;
        }
        if let Some(limit) = data.daily_usage_limit {
            key.daily_usage_limit = limit;
        }
        if let Some(limit) = data.monthly_usage_limit {
            key.monthly_usage_limit = limit;
        }
        if let Some(limit) = data.total_usage_limit {
            key.total_usage_limit = limit;
        }
        Ok(Some(key.clone()))
    }

    async fn revoke_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Res<Option<ApiKey>> {
        let mut inner = self.inner.write().await;
        Ok(inner.keys.get_mut(&key_id).map(|key| {
            key.revoked_at.get_or_insert(at);
            key.active = false;
            key.clone()
        }))
    }

    async fn touch_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Res<()> {
        if let Some(key) = self.inner.write().await.keys.get_mut(&key_id) {
            key.last_used = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl UsageLedger for MemoryStore {
    async fn append_usage(&self, record: NewUsageRecord) -> Res<UsageRecord> {
        let record = UsageRecord {
            id: Uuid::new_v4(),
            key_id: record.key_id,
            project_id: record.project_id,
            billing_user_id: record.billing_user_id,
            model: record.model,
            timestamp: record.timestamp,
            tokens_input: record.tokens_input,
            tokens_output: record.tokens_output,
            provider_cost: record.provider_cost,
            markup_amount: record.markup_amount,
            billed_cost: record.billed_cost,
            success: record.success,
            cached: record.cached,
            cache_hit: record.cache_hit,
            error_type: record.error_type,
        };
        self.inner.write().await.usage.push(record.clone());
        Ok(record)
    }

    async fn sum_billed_cost(
        &self,
        scope: UsageScope,
        since: Option<DateTime<Utc>>,
    ) -> Res<Decimal> {
        let inner = self.inner.read().await;
        if inner.fail_usage_reads {
            return Err(AppError::Internal("usage ledger unavailable".to_string()));
        }

        Ok(inner
            .usage
            .iter()
            .filter(|record| match scope {
                UsageScope::Key(key_id) => record.key_id == key_id,
                UsageScope::Project(project_id) => record.project_id == Some(project_id),
            })
            .filter(|record| since.is_none_or(|since| record.timestamp >= since))
            .map(|record| record.billed_cost)
            .sum())
    }

    async fn list_usage(&self, filter: UsageFilter) -> Res<Vec<UsageRecord>> {
        let inner = self.inner.read().await;
        if inner.fail_usage_reads {
            return Err(AppError::Internal("usage ledger unavailable".to_string()));
        }

        let mut records: Vec<UsageRecord> = inner
            .usage
            .iter()
            .filter(|r| filter.key_id.is_none_or(|id| r.key_id == id))
            .filter(|r| filter.project_id.is_none_or(|id| r.project_id == Some(id)))
            .filter(|r| filter.ending_before.is_none_or(|t| r.timestamp < t))
            .filter(|r| filter.starting_after.is_none_or(|t| r.timestamp > t))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(page_size(filter.limit) as usize);
        Ok(records)
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn get_project(&self, project_id: Uuid) -> Res<Option<Project>> {
        Ok(self.inner.read().await.projects.get(&project_id).cloned())
    }

    async fn get_member(&self, project_id: Uuid, user_id: Uuid) -> Res<Option<ProjectMember>> {
        Ok(self
            .inner
            .read()
            .await
            .members
            .get(&(project_id, user_id))
            .cloned())
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    async fn get_model(&self, model_id: &str) -> Res<Option<ModelConfig>> {
        Ok(self.inner.read().await.models.get(model_id).cloned())
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn find_alert_since(
        &self,
        project_id: Uuid,
        alert_type: &str,
        since: DateTime<Utc>,
    ) -> Res<Option<Alert>> {
        Ok(self
            .inner
            .read()
            .await
            .alerts
            .iter()
            .filter(|a| a.project_id == project_id && a.alert_type == alert_type)
            .filter(|a| a.created_at >= since)
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn insert_alert(&self, alert: NewAlert) -> Res<Option<Alert>> {
        let mut inner = self.inner.write().await;
        let exists = inner.alerts.iter().any(|a| {
            a.project_id == alert.project_id
                && a.alert_type == alert.alert_type
                && a.period == alert.period
        });
        if exists {
            return Ok(None);
        }

        let alert = Alert {
            id: Uuid::new_v4(),
            project_id: alert.project_id,
            alert_type: alert.alert_type,
            period: alert.period,
            message: alert.message,
            percent_used: alert.percent_used,
            created_at: Utc::now(),
        };
        inner.alerts.push(alert.clone());
        Ok(Some(alert))
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn insert_audit(&self, entry: NewAuditEntry) -> Res<()> {
        self.inner.write().await.audit.push(entry);
        Ok(())
    }
}
