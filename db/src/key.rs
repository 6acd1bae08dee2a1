use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    dtos::key::{KeyCreateRequest, KeyUpdateRequest},
    models::key::ApiKey,
};

pub async fn get_key_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    key_id: &Uuid,
) -> Res<Option<ApiKey>> {
    sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE id = $1")
        .bind(key_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_keys_by_user_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &Uuid,
) -> Res<Vec<ApiKey>> {
    sqlx::query_as::<_, ApiKey>(
        "SELECT * FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn insert_key<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: KeyCreateRequest,
) -> Res<ApiKey> {
    sqlx::query_as::<_, ApiKey>(
        r#"
        INSERT INTO api_keys (id, user_id, project_id, name, key_hash, expires,
                              daily_usage_limit, monthly_usage_limit, total_usage_limit)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(data.id)
    .bind(data.user_id)
    .bind(data.project_id)
    .bind(data.name)
    .bind(data.key_hash)
    .bind(data.expires)
    .bind(data.daily_usage_limit)
    .bind(data.monthly_usage_limit)
    .bind(data.total_usage_limit)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_key<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    key_id: Uuid,
    data: KeyUpdateRequest,
) -> Res<Option<ApiKey>> {
    if data.is_empty() {
        return get_key_by_id(executor, &key_id).await;
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE api_keys SET ");
    let mut first = true;

    // Helper to add the comma between assignments
    let mut add_separator = |qb: &mut QueryBuilder<Postgres>| {
        if !first {
            qb.push(", ");
        }
        first = false;
    };

    if let Some(name) = data.name {
        add_separator(&mut qb);
        qb.push("name = ").push_bind(name);
    }
    if let Some(active) = data.active {
        add_separator(&mut qb);
        qb.push("active = ").push_bind(active);
    }
    if let Some(expires) = data.expires {
        add_separator(&mut qb);
        qb.push("expires = ").push_bind(expires);
    }
    if let Some(limit) = data.daily_usage_limit {
        add_separator(&mut qb);
        qb.push("daily_usage_limit = ").push_bind(limit);
    }
    if let Some(limit) = data.monthly_usage_limit {
        add_separator(&mut qb);
        qb.push("monthly_usage_limit = ").push_bind(limit);
    }
    if let Some(limit) = data.total_usage_limit {
        add_separator(&mut qb);
        qb.push("total_usage_limit = ").push_bind(limit);
    }

    qb.push(" WHERE id = ").push_bind(key_id);
    qb.push(" RETURNING *");

    qb.build_query_as::<ApiKey>()
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn revoke_key<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    key_id: Uuid,
    at: DateTime<Utc>,
) -> Res<Option<ApiKey>> {
    sqlx::query_as::<_, ApiKey>(
        "UPDATE api_keys SET revoked_at = COALESCE(revoked_at, $1), active = FALSE WHERE id = $2 RETURNING *",
    )
    .bind(at)
    .bind(key_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn touch_key<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    key_id: Uuid,
    at: DateTime<Utc>,
) -> Res<()> {
    sqlx::query("UPDATE api_keys SET last_used = $1 WHERE id = $2")
        .bind(at)
        .bind(key_id)
        .execute(executor)
        .await
        .map_err(AppError::from)?;

    Ok(())
}
