use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use common::error::{AppError, error_response};
use thiserror::Error;

use crate::provider::ProviderFailure;

/// Errors of the completion surface, rendered as
/// `{"error": {"message", "type", "code"}}`.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing, undecodable, unknown or revoked key.
    #[error("{message}")]
    Authentication {
        message: String,
        code: &'static str,
    },

    /// A known key that may not be used right now.
    #[error("{message}")]
    KeyBlocked {
        message: String,
        code: &'static str,
    },

    #[error("{0}")]
    QuotaExceeded(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("The model '{0}' does not exist or is not available")]
    ModelNotFound(String),

    #[error("{}", .0.message())]
    Provider(ProviderFailure),

    #[error("Internal server error")]
    Internal(#[from] AppError),
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Authentication { .. } | GatewayError::KeyBlocked { .. } => {
                "authentication_error"
            }
            GatewayError::QuotaExceeded(_) => "quota_exceeded",
            GatewayError::InvalidRequest(_) | GatewayError::ModelNotFound(_) => {
                "invalid_request_error"
            }
            GatewayError::Provider(failure) => failure.kind(),
            GatewayError::Internal(_) => "server_error",
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        match self {
            GatewayError::Authentication { code, .. } | GatewayError::KeyBlocked { code, .. } => {
                Some(*code)
            }
            GatewayError::QuotaExceeded(_) => Some("usage_limit_exceeded"),
            GatewayError::ModelNotFound(_) => Some("model_not_found"),
            _ => None,
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            GatewayError::KeyBlocked { .. } => StatusCode::FORBIDDEN,
            GatewayError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::ModelNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Provider(failure) => StatusCode::from_u16(failure.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let GatewayError::Internal(e) = self {
            log::error!("Completion request failed: {}", e);
        }
        error_response(self.status_code(), self.kind(), self.code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use serde_json::Value;

    async fn render(error: GatewayError) -> (u16, Value) {
        let res = error.error_response();
        let status = res.status().as_u16();
        let bytes = to_bytes(res.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn quota_rejection_is_429_with_stable_type() {
        let (status, body) =
            render(GatewayError::QuotaExceeded("API key usage limit exceeded".into())).await;

        assert_eq!(status, 429);
        assert_eq!(body["error"]["type"], "quota_exceeded");
        assert_eq!(body["error"]["code"], "usage_limit_exceeded");
    }

    #[actix_web::test]
    async fn overloaded_provider_is_529() {
        let (status, body) = render(GatewayError::Provider(ProviderFailure::Overloaded)).await;

        assert_eq!(status, 529);
        assert_eq!(body["error"]["type"], "overloaded_error");
    }

    #[actix_web::test]
    async fn internal_detail_is_hidden() {
        let (status, body) = render(GatewayError::Internal(AppError::Internal(
            "connection refused to 10.0.0.5:5432".into(),
        )))
        .await;

        assert_eq!(status, 500);
        assert_eq!(body["error"]["message"], "Internal server error");
        assert_eq!(body["error"]["type"], "server_error");
    }
}
