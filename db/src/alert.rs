use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{dtos::alert::NewAlert, models::alert::Alert};

pub async fn get_latest_alert_since<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    project_id: &Uuid,
    alert_type: &str,
    since: DateTime<Utc>,
) -> Res<Option<Alert>> {
    sqlx::query_as::<_, Alert>(
        r#"
        SELECT * FROM alerts
        WHERE project_id = $1 AND alert_type = $2 AND created_at >= $3
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(project_id)
    .bind(alert_type)
    .bind(since)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Inserts the alert unless one of the same type already exists for the
/// project and period. Returns `None` when it already existed.
pub async fn insert_alert<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    alert: NewAlert,
) -> Res<Option<Alert>> {
    sqlx::query_as::<_, Alert>(
        r#"
        INSERT INTO alerts (project_id, alert_type, period, message, percent_used)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (project_id, alert_type, period) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(alert.project_id)
    .bind(alert.alert_type)
    .bind(alert.period)
    .bind(alert.message)
    .bind(alert.percent_used)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
