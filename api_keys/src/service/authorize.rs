//! Who may see or administer a key or a project.

use common::{
    error::Res,
    permission::{Permission, has_permission},
};
use db::{KeyStore, ProjectStore, models::key::ApiKey};
use uuid::Uuid;

/// Whether `user_id` may view the key. Unknown keys and unrelated users are
/// `false`, never an error; callers turn that into a 403 or 404.
pub async fn check_key_authorization<S>(store: &S, key_id: Uuid, user_id: Uuid) -> Res<bool>
where
    S: KeyStore + ProjectStore + ?Sized,
{
    match store.get_key(key_id).await? {
        Some(key) => can_access_key(store, &key, user_id, Permission::ApiKeysRead).await,
        None => Ok(false),
    }
}

/// A personal key is reserved to its owner. A project key is open to the
/// project owner and to members granted `permission`.
pub async fn can_access_key<S>(
    store: &S,
    key: &ApiKey,
    user_id: Uuid,
    permission: Permission,
) -> Res<bool>
where
    S: ProjectStore + ?Sized,
{
    match key.project_id {
        None => Ok(key.user_id == user_id),
        Some(project_id) => check_project_permission(store, project_id, user_id, permission).await,
    }
}

pub async fn check_project_permission<S>(
    store: &S,
    project_id: Uuid,
    user_id: Uuid,
    permission: Permission,
) -> Res<bool>
where
    S: ProjectStore + ?Sized,
{
    let Some(project) = store.get_project(project_id).await? else {
        return Ok(false);
    };
    if project.owner_id == user_id {
        return Ok(true);
    }

    let Some(member) = store.get_member(project_id, user_id).await? else {
        return Ok(false);
    };
    let Some(role) = member.role() else {
        log::warn!(
            "Member {} of project {} has unknown role '{}'",
            user_id,
            project_id,
            member.role
        );
        return Ok(false);
    };

    Ok(has_permission(role, &member.overrides(), permission))
}
