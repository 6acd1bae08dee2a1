use actix_web::{HttpResponse, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === APPLICATION ERRORS ===
    #[error("Authorization error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    #[error("{0}")]
    Internal(String),
}

/// Body of every error response: `{"error": {"message", "type", "code"?}}`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

/// Builds an error response with the shared envelope.
pub fn error_response(
    status: StatusCode,
    kind: &'static str,
    code: Option<&'static str>,
    message: impl Into<String>,
) -> HttpResponse {
    HttpResponse::build(status).json(ErrorEnvelope {
        error: ErrorBody {
            message: message.into(),
            kind,
            code,
        },
    })
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl AppError {
    /// Stable `type` string clients can match on.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "authentication_error",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "invalid_request_error",
            AppError::TooManyRequests(_) => "rate_limit_error",
            _ => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn to_http_response(&self) -> HttpResponse {
        match self {
            // === CONVERSION ERRORS ===
            AppError::Database(error) => log::error!("Database error: {}", error),
            AppError::Jwt(error) => log::error!("JWT error: {}", error),
            AppError::Reqwest(error) => log::error!("Reqwest error: {}", error),
            AppError::Json(error) => log::error!("JSON error: {}", error),
            AppError::Internal(error) => log::error!("Internal error: {}", error),
            _ => {}
        }

        let message = if self.is_internal() {
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        };
        error_response(self.status(), self.kind(), None, message)
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}
