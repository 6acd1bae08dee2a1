use std::sync::Arc;

use actix_web::{
    Responder, get,
    web::{self},
};
use common::{error::Res, http::Success, jwt::JwtClaims};
use db::Store;
use uuid::Uuid;

use crate::service;

#[get("/{project_id}/spend")]
pub async fn get_spend(
    claims: web::ReqData<JwtClaims>,
    store: web::Data<Arc<dyn Store>>,
    path: web::Path<Uuid>,
) -> Res<impl Responder> {
    let status =
        service::project::get_project_spend(store.get_ref().as_ref(), claims.user_id, path.into_inner()).await?;
    Success::ok(status)
}
