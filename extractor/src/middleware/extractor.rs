use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures::future::{Ready, ok};

use common::{
    error::AppError,
    jwt::{self, JwtClaims},
    key::bearer_token,
};

pub struct ExtractionMiddleware {
    secret: Arc<str>,
}

impl ExtractionMiddleware {
    pub fn new(secret: String) -> Self {
        Self {
            secret: Arc::from(secret),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ExtractionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = ExtractionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ExtractionMiddlewareService {
            service: Rc::new(service),
            secret: Arc::clone(&self.secret),
        })
    }
}

pub struct ExtractionMiddlewareService<S> {
    service: Rc<S>,
    secret: Arc<str>,
}

impl<S, B> Service<ServiceRequest> for ExtractionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // retrieve token from authorization header
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_owned);

        let claims = match token {
            Some(token) => jwt::validate_jwt(&token, &self.secret),
            None => Err(AppError::Unauthorized("Missing bearer token".to_string())),
        };
        let srv = Rc::clone(&self.service);

        Box::pin(async move {
            match claims {
                Ok(claims) => {
                    // handlers read these through web::ReqData<JwtClaims>
                    req.extensions_mut().insert::<JwtClaims>(claims);
                    srv.call(req).await.map(|res| res.map_into_boxed_body())
                }
                Err(e) => {
                    log::debug!("Rejected dashboard request to {}: {}", req.path(), e);
                    Ok(req.error_response(e))
                }
            }
        })
    }
}
