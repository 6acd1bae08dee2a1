//! Audit trail of key management and completion traffic.

use std::{fmt, net::IpAddr, str::FromStr, sync::Arc};

use actix_web::HttpRequest;
use chrono::Utc;
use db::{AuditStore, dtos::audit::NewAuditEntry};
use log::error;
use serde::Serialize;
use serde_json::Value;
use sqlx::types::ipnetwork::IpNetwork;
use uuid::Uuid;

use crate::geo::GeoLocator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CompletionSucceeded,
    CompletionFailed,
    CompletionRejected,
    #[serde(rename = "apikey_created")]
    ApiKeyCreated,
    #[serde(rename = "apikey_create_failed")]
    ApiKeyCreateFailed,
    #[serde(rename = "apikey_updated")]
    ApiKeyUpdated,
    #[serde(rename = "apikey_update_failed")]
    ApiKeyUpdateFailed,
    #[serde(rename = "apikey_revoked")]
    ApiKeyRevoked,
    #[serde(rename = "apikey_revoke_failed")]
    ApiKeyRevokeFailed,
    BudgetAlertTriggered,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CompletionSucceeded => "completion_succeeded",
            AuditAction::CompletionFailed => "completion_failed",
            AuditAction::CompletionRejected => "completion_rejected",
            AuditAction::ApiKeyCreated => "apikey_created",
            AuditAction::ApiKeyCreateFailed => "apikey_create_failed",
            AuditAction::ApiKeyUpdated => "apikey_updated",
            AuditAction::ApiKeyUpdateFailed => "apikey_update_failed",
            AuditAction::ApiKeyRevoked => "apikey_revoked",
            AuditAction::ApiKeyRevokeFailed => "apikey_revoke_failed",
            AuditAction::BudgetAlertTriggered => "budget_alert_triggered",
        }
    }

    /// The failure counterpart of a key management action.
    pub fn failed(self) -> Self {
        match self {
            AuditAction::ApiKeyCreated => AuditAction::ApiKeyCreateFailed,
            AuditAction::ApiKeyUpdated => AuditAction::ApiKeyUpdateFailed,
            AuditAction::ApiKeyRevoked => AuditAction::ApiKeyRevokeFailed,
            AuditAction::CompletionSucceeded => AuditAction::CompletionFailed,
            other => other,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingKey,
    InvalidKey,
    RevokedKey,
    KeyInactive,
    KeyExpired,
    KeyNotFound,
    LimitExceeded,
    InvalidPayload,
    UnknownModel,
    ProviderError,
    InternalError,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingKey => "missing_key",
            RejectReason::InvalidKey => "invalid_key",
            RejectReason::RevokedKey => "revoked_key",
            RejectReason::KeyInactive => "key_inactive",
            RejectReason::KeyExpired => "key_expired",
            RejectReason::KeyNotFound => "key_not_found",
            RejectReason::LimitExceeded => "limit_exceeded",
            RejectReason::InvalidPayload => "invalid_payload",
            RejectReason::UnknownModel => "unknown_model",
            RejectReason::ProviderError => "provider_error",
            RejectReason::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request came from.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl RequestOrigin {
    pub fn from_request(req: &HttpRequest) -> Self {
        let ip = req
            .connection_info()
            .realip_remote_addr()
            .and_then(parse_ip);
        let user_agent = req
            .headers()
            .get("User-Agent")
            .and_then(|ua| ua.to_str().ok())
            .map(str::to_string);

        RequestOrigin { ip, user_agent }
    }
}

// `realip_remote_addr` may carry a port.
fn parse_ip(addr: &str) -> Option<IpAddr> {
    IpAddr::from_str(addr)
        .ok()
        .or_else(|| addr.parse::<std::net::SocketAddr>().ok().map(|s| s.ip()))
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub reason: Option<RejectReason>,
    pub user_id: Option<Uuid>,
    pub key_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub metadata: Value,
}

impl AuditEvent {
    pub fn new(action: AuditAction) -> Self {
        AuditEvent {
            action,
            reason: None,
            user_id: None,
            key_id: None,
            project_id: None,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn reason(mut self, reason: RejectReason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn key(mut self, key_id: Uuid) -> Self {
        self.key_id = Some(key_id);
        self
    }

    pub fn project(mut self, project_id: Option<Uuid>) -> Self {
        self.project_id = project_id;
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Switches the action to its failure counterpart.
    pub fn failed(mut self) -> Self {
        self.action = self.action.failed();
        self
    }
}

/// Writes audit entries. Recording never fails the caller: store errors are
/// logged and swallowed.
pub struct Auditor {
    store: Arc<dyn AuditStore>,
    geo: Option<GeoLocator>,
}

impl Auditor {
    pub fn new(store: Arc<dyn AuditStore>, geo: Option<GeoLocator>) -> Self {
        Auditor { store, geo }
    }

    pub async fn record(&self, event: AuditEvent, origin: &RequestOrigin) {
        let location = match (&self.geo, origin.ip) {
            (Some(geo), Some(ip)) => geo.locate(ip).await,
            _ => None,
        };
        let (country, city) = location
            .map(|l| (l.country, l.city))
            .unwrap_or_default();

        let action = event.action;
        let entry = NewAuditEntry {
            timestamp: Utc::now(),
            action: action.as_str().to_string(),
            reason: event.reason.map(|r| r.as_str().to_string()),
            user_id: event.user_id,
            key_id: event.key_id,
            project_id: event.project_id,
            ip_address: origin.ip.map(IpNetwork::from),
            user_agent: origin.user_agent.clone(),
            country,
            city,
            metadata: event.metadata,
        };

        if let Err(e) = self.store.insert_audit(entry).await {
            error!("Failed to record audit entry {}: {}", action, e);
        }
    }
}
