use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Configuration error
    ConfigError(String),
    /// Authentication error
    Unauthorized(String),
    /// Free-tier calculation limit reached (expected business outcome,
    /// not an infrastructure failure)
    LimitReached(String),
    /// Requested entity does not exist or is not owned by the caller
    NotFound(String),
    /// Malformed request payload
    InvalidRequest(String),
    /// Stored project record is missing or has unparseable pricing fields
    InvalidProjectRecord(String),
    /// Payment provider rejected the request (status passed through)
    PaymentError { status: StatusCode, message: String },
    /// Database error
    Database(sqlx::Error),
    /// HTTP request error (preserves reqwest::Error for diagnostics)
    HttpRequest(reqwest::Error),
    /// Internal server error
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::LimitReached(msg) => write!(f, "Limit reached: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::InvalidProjectRecord(msg) => write!(f, "Invalid project record: {}", msg),
            Self::PaymentError { status, message } => {
                write!(f, "Payment error ({}): {}", status, message)
            }
            Self::Database(err) => write!(f, "Database error: {}", err),
            Self::HttpRequest(err) => write!(f, "HTTP request error: {}", err),
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::LimitReached(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::InvalidProjectRecord(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::PaymentError { status, message } => (*status, message.clone()),
            Self::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Self::HttpRequest(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
            Self::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        // Clients branch on limit_reached to show the upgrade prompt, so the
        // flag rides alongside the generic error envelope.
        let body = if matches!(self, Self::LimitReached(_)) {
            Json(json!({
                "error": {
                    "message": error_message,
                    "type": error_type_name(&self),
                },
                "limit_reached": true,
            }))
        } else {
            Json(json!({
                "error": {
                    "message": error_message,
                    "type": error_type_name(&self),
                }
            }))
        };

        (status, body).into_response()
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::ConfigError(_) => "config_error",
        AppError::Unauthorized(_) => "unauthorized",
        AppError::LimitReached(_) => "limit_reached",
        AppError::NotFound(_) => "not_found",
        AppError::InvalidRequest(_) => "invalid_request",
        AppError::InvalidProjectRecord(_) => "invalid_project_record",
        AppError::PaymentError { .. } => "payment_error",
        AppError::Database(_) => "database_error",
        AppError::HttpRequest(_) => "http_request_error",
        AppError::InternalError(_) => "internal_error",
    }
}

// Implement conversions from common error types
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpRequest(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AppError::NotFound("project 42".to_string());
        assert_eq!(error.to_string(), "Not found: project 42");
    }

    #[test]
    fn test_error_type_name() {
        assert_eq!(
            error_type_name(&AppError::Unauthorized("test".to_string())),
            "unauthorized"
        );
        assert_eq!(
            error_type_name(&AppError::LimitReached("test".to_string())),
            "limit_reached"
        );
    }

    #[tokio::test]
    async fn test_limit_reached_response_is_403() {
        let error = AppError::LimitReached("upgrade to continue".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_record_response_is_422() {
        let error = AppError::InvalidProjectRecord("bad materials column".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
