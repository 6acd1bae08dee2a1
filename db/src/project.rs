use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::project::{Project, ProjectMember};

pub async fn get_project_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    project_id: &Uuid,
) -> Res<Option<Project>> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(project_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_member<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    project_id: &Uuid,
    user_id: &Uuid,
) -> Res<Option<ProjectMember>> {
    sqlx::query_as::<_, ProjectMember>(
        "SELECT * FROM project_members WHERE project_id = $1 AND user_id = $2",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
