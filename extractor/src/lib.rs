use middleware::extractor::ExtractionMiddleware;

pub mod middleware {
    pub mod extractor;
}

/// Dashboard authentication: requires a valid JWT and exposes its
/// `JwtClaims` to handlers through `web::ReqData`.
pub fn middleware(jwt_secret: impl Into<String>) -> ExtractionMiddleware {
    ExtractionMiddleware::new(jwt_secret.into())
}
