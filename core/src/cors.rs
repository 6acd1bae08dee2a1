use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};

/// Dashboard origin only; the completion surface is called server to server.
pub fn middleware(origin: &str) -> Cors {
    Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-api-key"),
        ])
        .allowed_origin(origin)
        .max_age(3600)
}
