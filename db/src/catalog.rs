use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::models::catalog::ModelConfig;

pub async fn get_model_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    model_id: &str,
) -> Res<Option<ModelConfig>> {
    sqlx::query_as::<_, ModelConfig>("SELECT * FROM models WHERE id = $1")
        .bind(model_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}
