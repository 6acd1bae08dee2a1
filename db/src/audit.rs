use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::dtos::audit::NewAuditEntry;

pub async fn insert_audit<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    entry: NewAuditEntry,
) -> Res<()> {
    sqlx::query(
        "INSERT INTO audit_logs (timestamp, action, reason, user_id, key_id, project_id, ip_address, user_agent, country, city, metadata)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(entry.timestamp)
    .bind(&entry.action)
    .bind(&entry.reason)
    .bind(entry.user_id)
    .bind(entry.key_id)
    .bind(entry.project_id)
    .bind(entry.ip_address)
    .bind(&entry.user_agent)
    .bind(&entry.country)
    .bind(&entry.city)
    .bind(&entry.metadata)
    .execute(executor)
    .await
    .map_err(AppError::from)?;

    Ok(())
}
