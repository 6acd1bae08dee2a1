use std::sync::Arc;

use actix_web::{
    HttpRequest, Responder, get, post, put,
    web::{self},
};
use common::{error::Res, http::Success, jwt::JwtClaims};
use db::Store;
use logger::{Auditor, RequestOrigin};
use uuid::Uuid;

use crate::{
    dtos::key::{CreateKeyRequest, UpdateKeyRequest},
    service,
};

/// Retrieves all API keys owned by the authenticated user.
#[get("")]
pub async fn get_keys(
    claims: web::ReqData<JwtClaims>,
    store: web::Data<Arc<dyn Store>>,
) -> Res<impl Responder> {
    let keys = service::key::get_keys(store.get_ref().as_ref(), claims.user_id).await?;
    Success::ok(keys)
}

/// Issues a new API key. The raw key is part of this response only.
#[post("")]
pub async fn post_create_key(
    req: HttpRequest,
    claims: web::ReqData<JwtClaims>,
    store: web::Data<Arc<dyn Store>>,
    auditor: web::Data<Arc<Auditor>>,
    body: web::Json<CreateKeyRequest>,
) -> Res<impl Responder> {
    let key = service::key::create_key(
        store.get_ref().as_ref(),
        &auditor,
        claims.user_id,
        body.into_inner(),
        &RequestOrigin::from_request(&req),
    )
    .await?;
    Success::created(key)
}

/// Updates name, activation, expiry and limits of a key.
#[put("/{key_id}")]
pub async fn put_update_key(
    req: HttpRequest,
    claims: web::ReqData<JwtClaims>,
    store: web::Data<Arc<dyn Store>>,
    auditor: web::Data<Arc<Auditor>>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateKeyRequest>,
) -> Res<impl Responder> {
    let key = service::key::update_key(
        store.get_ref().as_ref(),
        &auditor,
        claims.user_id,
        path.into_inner(),
        body.into_inner(),
        &RequestOrigin::from_request(&req),
    )
    .await?;
    Success::ok(key)
}

/// Revokes a key permanently.
#[post("/{key_id}/revoke")]
pub async fn post_revoke(
    req: HttpRequest,
    claims: web::ReqData<JwtClaims>,
    store: web::Data<Arc<dyn Store>>,
    auditor: web::Data<Arc<Auditor>>,
    path: web::Path<Uuid>,
) -> Res<impl Responder> {
    let key = service::key::revoke_key(
        store.get_ref().as_ref(),
        &auditor,
        claims.user_id,
        path.into_inner(),
        &RequestOrigin::from_request(&req),
    )
    .await?;
    Success::ok(key)
}
