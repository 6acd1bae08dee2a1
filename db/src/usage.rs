use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres, QueryBuilder};

use crate::{
    dtos::usage::{NewUsageRecord, UsageFilter, UsageScope},
    models::usage::UsageRecord,
};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

pub async fn insert_usage<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    record: NewUsageRecord,
) -> Res<UsageRecord> {
    sqlx::query_as::<_, UsageRecord>(
        r#"
        INSERT INTO usage_records (key_id, project_id, billing_user_id, model, timestamp,
                                   tokens_input, tokens_output, provider_cost, markup_amount,
                                   billed_cost, success, cached, cache_hit, error_type)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(record.key_id)
    .bind(record.project_id)
    .bind(record.billing_user_id)
    .bind(record.model)
    .bind(record.timestamp)
    .bind(record.tokens_input)
    .bind(record.tokens_output)
    .bind(record.provider_cost)
    .bind(record.markup_amount)
    .bind(record.billed_cost)
    .bind(record.success)
    .bind(record.cached)
    .bind(record.cache_hit)
    .bind(record.error_type)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Sum of `billed_cost` for the scope, from `since` (inclusive) onwards,
/// or over all time when `since` is `None`.
pub async fn sum_billed_cost<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    scope: UsageScope,
    since: Option<DateTime<Utc>>,
) -> Res<Decimal> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COALESCE(SUM(billed_cost), 0) FROM usage_records WHERE ");

    match scope {
        UsageScope::Key(key_id) => qb.push("key_id = ").push_bind(key_id),
        UsageScope::Project(project_id) => qb.push("project_id = ").push_bind(project_id),
    };

    if let Some(since) = since {
        qb.push(" AND timestamp >= ").push_bind(since);
    }

    qb.build_query_scalar::<Decimal>()
        .fetch_one(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_usage<'e, E>(executor: E, filter: UsageFilter) -> Res<Vec<UsageRecord>>
where
    E: Executor<'e, Database = Postgres>,
{
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM usage_records");
    let mut conditions_added = false;

    // Helper to add WHERE or AND
    let mut add_condition_separator = |qb: &mut QueryBuilder<Postgres>| {
        if !conditions_added {
            qb.push(" WHERE ");
            conditions_added = true;
        } else {
            qb.push(" AND ");
        }
    };

    if let Some(key_id) = filter.key_id {
        add_condition_separator(&mut qb);
        qb.push("key_id = ").push_bind(key_id);
    }

    if let Some(project_id) = filter.project_id {
        add_condition_separator(&mut qb);
        qb.push("project_id = ").push_bind(project_id);
    }

    if let Some(ending_before) = filter.ending_before {
        add_condition_separator(&mut qb);
        qb.push("timestamp < ").push_bind(ending_before);
    }

    if let Some(starting_after) = filter.starting_after {
        add_condition_separator(&mut qb);
        qb.push("timestamp > ").push_bind(starting_after);
    }

    qb.push(" ORDER BY timestamp DESC");
    qb.push(" LIMIT ").push_bind(page_size(filter.limit));

    qb.build_query_as::<UsageRecord>()
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

pub fn page_size(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}
