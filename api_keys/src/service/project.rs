use billing::{EvaluationTime, ProjectSpendStatus, project_spend_status};
use common::{
    error::{AppError, Res},
    permission::Permission,
};
use db::Store;
use uuid::Uuid;

use crate::service::authorize::check_project_permission;

/// Current-month spend of a project, for its owner and members with `billing:read`.
pub async fn get_project_spend(
    store: &dyn Store,
    user_id: Uuid,
    project_id: Uuid,
) -> Res<ProjectSpendStatus> {
    if !check_project_permission(store, project_id, user_id, Permission::BillingRead).await? {
        return Err(AppError::NotFound("Project not found".to_string()));
    }
    project_spend_status(store, project_id, EvaluationTime::now())
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
}
