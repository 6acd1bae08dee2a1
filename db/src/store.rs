//! Collaborator traits the billing engine talks to, and their Postgres
//! implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::Res;
use rust_decimal::Decimal;
use sqlx::PgPool;
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
};

/// Key configuration collaborator.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn get_key(&self, key_id: Uuid) -> Res<Option<ApiKey>>;

    async fn list_keys_by_user(&self, user_id: Uuid) -> Res<Vec<ApiKey>>;

    async fn insert_key(&self, data: KeyCreateRequest) -> Res<ApiKey>;

    async fn update_key(&self, key_id: Uuid, data: KeyUpdateRequest) -> Res<Option<ApiKey>>;

    /// Marks the key revoked and inactive. Revoking twice keeps the first timestamp.
    async fn revoke_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Res<Option<ApiKey>>;

    async fn touch_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Res<()>;
}

/// Append-only usage ledger.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    async fn append_usage(&self, record: NewUsageRecord) -> Res<UsageRecord>;

    async fn sum_billed_cost(
        &self,
        scope: UsageScope,
        since: Option<DateTime<Utc>>,
    ) -> Res<Decimal>;

    /// Newest first.
    async fn list_usage(&self, filter: UsageFilter) -> Res<Vec<UsageRecord>>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get_project(&self, project_id: Uuid) -> Res<Option<Project>>;

    async fn get_member(&self, project_id: Uuid, user_id: Uuid) -> Res<Option<ProjectMember>>;
}

#[async_trait]
pub trait ModelStore: Send + Sync {
    async fn get_model(&self, model_id: &str) -> Res<Option<ModelConfig>>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn find_alert_since(
        &self,
        project_id: Uuid,
        alert_type: &str,
        since: DateTime<Utc>,
    ) -> Res<Option<Alert>>;

    /// `None` when an alert of the same type already exists for the period.
    async fn insert_alert(&self, alert: NewAlert) -> Res<Option<Alert>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_audit(&self, entry: NewAuditEntry) -> Res<()>;
}

/// Everything the service needs from persistence.
pub trait Store:
    KeyStore + UsageLedger + ProjectStore + ModelStore + AlertStore + AuditStore
{
}

impl<T> Store for T where
    T: KeyStore + UsageLedger + ProjectStore + ModelStore + AlertStore + AuditStore
{
}

#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyStore for PgStore {
    async fn get_key(&self, key_id: Uuid) -> Res<Option<ApiKey>> {
        crate::key::get_key_by_id(&*self.pool, &key_id).await
    }

    async fn list_keys_by_user(&self, user_id: Uuid) -> Res<Vec<ApiKey>> {
        crate::key::get_keys_by_user_id(&*self.pool, &user_id).await
    }

    async fn insert_key(&self, data: KeyCreateRequest) -> Res<ApiKey> {
        crate::key::insert_key(&*self.pool, data).await
    }

    async fn update_key(&self, key_id: Uuid, data: KeyUpdateRequest) -> Res<Option<ApiKey>> {
        crate::key::update_key(&*self.pool, key_id, data).await
    }

    async fn revoke_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Res<Option<ApiKey>> {
        crate::key::revoke_key(&*self.pool, key_id, at).await
    }

    async fn touch_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Res<()> {
        crate::key::touch_key(&*self.pool, key_id, at).await
    }
}

#[async_trait]
impl UsageLedger for PgStore {
    async fn append_usage(&self, record: NewUsageRecord) -> Res<UsageRecord> {
        crate::usage::insert_usage(&*self.pool, record).await
    }

    async fn sum_billed_cost(
        &self,
        scope: UsageScope,
        since: Option<DateTime<Utc>>,
    ) -> Res<Decimal> {
        crate::usage::sum_billed_cost(&*self.pool, scope, since).await
    }

    async fn list_usage(&self, filter: UsageFilter) -> Res<Vec<UsageRecord>> {
        crate::usage::get_usage(&*self.pool, filter).await
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn get_project(&self, project_id: Uuid) -> Res<Option<Project>> {
        crate::project::get_project_by_id(&*self.pool, &project_id).await
    }

    async fn get_member(&self, project_id: Uuid, user_id: Uuid) -> Res<Option<ProjectMember>> {
        crate::project::get_member(&*self.pool, &project_id, &user_id).await
    }
}

#[async_trait]
impl ModelStore for PgStore {
    async fn get_model(&self, model_id: &str) -> Res<Option<ModelConfig>> {
        crate::catalog::get_model_by_id(&*self.pool, model_id).await
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn find_alert_since(
        &self,
        project_id: Uuid,
        alert_type: &str,
        since: DateTime<Utc>,
    ) -> Res<Option<Alert>> {
        crate::alert::get_latest_alert_since(&*self.pool, &project_id, alert_type, since).await
    }

    async fn insert_alert(&self, alert: NewAlert) -> Res<Option<Alert>> {
        crate::alert::insert_alert(&*self.pool, alert).await
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn insert_audit(&self, entry: NewAuditEntry) -> Res<()> {
        crate::audit::insert_audit(&*self.pool, entry).await
    }
}
