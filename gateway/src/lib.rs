use actix_web::web;

pub mod dtos {
    pub mod completion;
}

pub mod error;
pub mod provider;

pub mod service {
    pub mod gate;
}

pub mod routes {
    pub mod completion;
}

pub use error::GatewayError;
pub use provider::{CompletionProvider, ProviderFailure, SimulatedProvider};
pub use service::gate::AdmissionGate;

pub fn mount_completions() -> actix_web::Scope {
    web::scope("/chat").service(routes::completion::post_chat_completions)
}
