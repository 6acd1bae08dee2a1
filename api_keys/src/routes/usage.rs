use std::sync::Arc;

use actix_web::{
    Responder, get,
    web::{self},
};
use billing::EvaluationTime;
use common::{error::Res, http::Success, jwt::JwtClaims};
use db::Store;
use uuid::Uuid;

use crate::{dtos::usage::UsageRecordsQuery, service};

/// Spend of a key per window against its limits.
#[get("/{key_id}/usage")]
pub async fn get_usage(
    claims: web::ReqData<JwtClaims>,
    store: web::Data<Arc<dyn Store>>,
    path: web::Path<Uuid>,
) -> Res<impl Responder> {
    let status = service::usage::get_key_usage(
        store.get_ref().as_ref(),
        claims.user_id,
        path.into_inner(),
        EvaluationTime::now(),
    )
    .await?;
    Success::ok(status)
}

/// Ledger records of a key, newest first.
#[get("/{key_id}/records")]
pub async fn get_records(
    claims: web::ReqData<JwtClaims>,
    store: web::Data<Arc<dyn Store>>,
    path: web::Path<Uuid>,
    query: web::Query<UsageRecordsQuery>,
) -> Res<impl Responder> {
    let records = service::usage::get_key_records(
        store.get_ref().as_ref(),
        claims.user_id,
        path.into_inner(),
        query.into_inner(),
    )
    .await?;
    Success::ok(records)
}
