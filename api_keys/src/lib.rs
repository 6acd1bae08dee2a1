use actix_web::web;

pub mod routes {
    pub mod key;
    pub mod project;
    pub mod usage;
}

pub mod service {
    pub mod authorize;
    pub(crate) mod key;
    pub(crate) mod project;
    pub mod resolve;
    pub(crate) mod usage;
}
mod dtos {
    pub(crate) mod key;
    pub(crate) mod usage;
}

pub use service::{
    authorize::check_key_authorization,
    resolve::{ResolveError, resolve_key},
};

pub fn mount_keys() -> actix_web::Scope {
    web::scope("/keys")
        .service(routes::key::get_keys)
        .service(routes::key::post_create_key)
        .service(routes::key::put_update_key)
        .service(routes::key::post_revoke)
        .service(routes::usage::get_usage)
        .service(routes::usage::get_records)
}

pub fn mount_projects() -> actix_web::Scope {
    web::scope("/projects").service(routes::project::get_spend)
}
