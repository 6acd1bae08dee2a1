use billing::{EvaluationTime, KeyUsageStatus, get_key_usage_status_at};
use common::error::{AppError, Res};
use db::{Store, dtos::usage::UsageFilter, models::usage::UsageRecord};
use uuid::Uuid;

use crate::{dtos::usage::UsageRecordsQuery, service::authorize::check_key_authorization};

/// Usage status of a key the caller may view; other keys read as missing.
pub async fn get_key_usage(
    store: &dyn Store,
    user_id: Uuid,
    key_id: Uuid,
    at: EvaluationTime,
) -> Res<KeyUsageStatus> {
    if !check_key_authorization(store, key_id, user_id).await? {
        return Err(AppError::NotFound("API key not found".to_string()));
    }
    get_key_usage_status_at(store, key_id, at).await
}

/// Recent ledger records of a key, newest first.
pub async fn get_key_records(
    store: &dyn Store,
    user_id: Uuid,
    key_id: Uuid,
    query: UsageRecordsQuery,
) -> Res<Vec<UsageRecord>> {
    if !check_key_authorization(store, key_id, user_id).await? {
        return Err(AppError::NotFound("API key not found".to_string()));
    }
    if let (Some(after), Some(before)) = (query.starting_after, query.ending_before) {
        if after >= before {
            return Err(AppError::BadRequest(
                "starting_after must be earlier than ending_before".to_string(),
            ));
        }
    }

    store
        .list_usage(UsageFilter {
            key_id: Some(key_id),
            project_id: None,
            limit: query.limit,
            ending_before: query.ending_before,
            starting_after: query.starting_after,
        })
        .await
}
