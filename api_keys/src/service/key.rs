use chrono::Utc;
use common::{
    error::{AppError, Res},
    key::{KeyClaims, hash_secret},
    permission::Permission,
};
use db::{
    Store,
    dtos::key::{KeyCreateRequest, KeyUpdateRequest},
    models::key::ApiKey,
};
use logger::{AuditAction, AuditEvent, Auditor, RequestOrigin};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::{
    dtos::key::{CreateKeyRequest, CreateKeyResponse, UpdateKeyRequest},
    service::authorize::{can_access_key, check_project_permission},
};

const MAX_NAME_LEN: usize = 100;
/// Limits are stored as NUMERIC(20, 10).
const LIMIT_SCALE: u32 = 10;
const LIMIT_INTEGER_DIGITS: u32 = 10;

/// Retrieves the keys owned by a user, newest first.
pub async fn get_keys(store: &dyn Store, user_id: Uuid) -> Res<Vec<ApiKey>> {
    store.list_keys_by_user(user_id).await
}

/// Issues a new key. The raw key is generated here, only its secret's hash
/// is persisted.
pub async fn create_key(
    store: &dyn Store,
    auditor: &Auditor,
    user_id: Uuid,
    req: CreateKeyRequest,
    origin: &RequestOrigin,
) -> Res<CreateKeyResponse> {
    let project_id = req.project_id;
    let result = issue_key(store, user_id, req).await;

    let event = match &result {
        Ok(created) => AuditEvent::new(AuditAction::ApiKeyCreated)
            .key(created.record.id)
            .metadata(json!({ "name": created.record.name })),
        Err(e) => AuditEvent::new(AuditAction::ApiKeyCreateFailed)
            .metadata(json!({ "error": e.to_string() })),
    };
    auditor
        .record(event.user(user_id).project(project_id), origin)
        .await;

    result
}

async fn issue_key(
    store: &dyn Store,
    user_id: Uuid,
    req: CreateKeyRequest,
) -> Res<CreateKeyResponse> {
    let name = validate_name(&req.name)?;
    for limit in [
        req.daily_usage_limit,
        req.monthly_usage_limit,
        req.total_usage_limit,
    ] {
        validate_limit(limit)?;
    }

    if let Some(project_id) = req.project_id {
        if !check_project_permission(store, project_id, user_id, Permission::ApiKeysWrite).await? {
            return Err(AppError::NotFound("Project not found".to_string()));
        }
    }

    let claims = KeyClaims::generate(Uuid::new_v4());
    let record = store
        .insert_key(KeyCreateRequest {
            id: claims.key_id,
            user_id,
            project_id: req.project_id,
            name,
            key_hash: hash_secret(&claims.secret)?,
            expires: req.expires,
            daily_usage_limit: req.daily_usage_limit,
            monthly_usage_limit: req.monthly_usage_limit,
            total_usage_limit: req.total_usage_limit,
        })
        .await?;
    log::info!("Issued API key {} for user {}", record.id, user_id);

    Ok(CreateKeyResponse {
        key: claims.to_key(),
        record,
    })
}

pub async fn update_key(
    store: &dyn Store,
    auditor: &Auditor,
    user_id: Uuid,
    key_id: Uuid,
    req: UpdateKeyRequest,
    origin: &RequestOrigin,
) -> Res<ApiKey> {
    let result = apply_update(store, user_id, key_id, req).await;

    let event = match &result {
        Ok(key) => AuditEvent::new(AuditAction::ApiKeyUpdated)
            .project(key.project_id)
            .metadata(json!({ "active": key.active, "limits": key.limits() })),
        Err(e) => AuditEvent::new(AuditAction::ApiKeyUpdateFailed)
            .metadata(json!({ "error": e.to_string() })),
    };
    auditor
        .record(event.user(user_id).key(key_id), origin)
        .await;

    result
}

async fn apply_update(
    store: &dyn Store,
    user_id: Uuid,
    key_id: Uuid,
    req: UpdateKeyRequest,
) -> Res<ApiKey> {
    let key = writable_key(store, user_id, key_id).await?;

    let update = KeyUpdateRequest {
        name: req.name.as_deref().map(validate_name).transpose()?,
        active: req.active,
        expires: req.expires,
        daily_usage_limit: req.daily_usage_limit,
        monthly_usage_limit: req.monthly_usage_limit,
        total_usage_limit: req.total_usage_limit,
    };
    if update.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }
    for limit in [
        update.daily_usage_limit,
        update.monthly_usage_limit,
        update.total_usage_limit,
    ] {
        validate_limit(limit.flatten())?;
    }
    if key.is_revoked() && update.active == Some(true) {
        return Err(AppError::BadRequest(
            "Revoked keys cannot be reactivated".to_string(),
        ));
    }

    store
        .update_key(key_id, update)
        .await?
        .ok_or_else(|| AppError::NotFound("API key not found".to_string()))
}

/// Revokes a key for good.
pub async fn revoke_key(
    store: &dyn Store,
    auditor: &Auditor,
    user_id: Uuid,
    key_id: Uuid,
    origin: &RequestOrigin,
) -> Res<ApiKey> {
    let result = async {
        writable_key(store, user_id, key_id).await?;
        store
            .revoke_key(key_id, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound("API key not found".to_string()))
    }
    .await;

    let event = match &result {
        Ok(key) => AuditEvent::new(AuditAction::ApiKeyRevoked).project(key.project_id),
        Err(e) => AuditEvent::new(AuditAction::ApiKeyRevokeFailed)
            .metadata(json!({ "error": e.to_string() })),
    };
    auditor
        .record(event.user(user_id).key(key_id), origin)
        .await;

    result
}

// Keys the caller may not administer are reported as missing.
async fn writable_key(store: &dyn Store, user_id: Uuid, key_id: Uuid) -> Res<ApiKey> {
    let key = store
        .get_key(key_id)
        .await?
        .ok_or_else(|| AppError::NotFound("API key not found".to_string()))?;

    if !can_access_key(store, &key, user_id, Permission::ApiKeysWrite).await? {
        return Err(AppError::NotFound("API key not found".to_string()));
    }
    Ok(key)
}

fn validate_name(name: &str) -> Res<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Key name must be between 1 and {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn validate_limit(limit: Option<Decimal>) -> Res<()> {
    let Some(limit) = limit else {
        return Ok(());
    };
    if limit.is_sign_negative() && !limit.is_zero() {
        return Err(AppError::BadRequest(
            "Usage limits must not be negative".to_string(),
        ));
    }
    if limit >= Decimal::from(10_i64.pow(LIMIT_INTEGER_DIGITS)) {
        return Err(AppError::BadRequest(format!(
            "Usage limits must be below 10^{}",
            LIMIT_INTEGER_DIGITS
        )));
    }
    if limit.normalize().scale() > LIMIT_SCALE {
        return Err(AppError::BadRequest(format!(
            "Usage limits allow at most {} decimal places",
            LIMIT_SCALE
        )));
    }
    Ok(())
}
