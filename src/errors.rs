use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body rendered by the API boundary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Bad Request", "Unauthorized")
    #[schema(example = "Bad Request")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "product name: a product with this name already exists")]
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    #[schema(example = "2025-06-09T10:30:00.000Z")]
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    /// Referenced entity absent. The storefront surface renders unknown
    /// product/order ids as 400, matching the original API contract.
    #[error("{field}: {message}")]
    NotFound { field: String, message: String },

    #[error("{field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{field}: {message}")]
    EmptyContent { field: String, message: String },

    #[error("Payment provider error: {0}")]
    PaymentProviderError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError {
            field: "request".to_string(),
            message: err.to_string(),
        }
    }
}

impl ServiceError {
    pub fn not_found(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } | Self::ValidationError { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::EmptyContent { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message suitable for HTTP responses. Internal errors return a generic
    /// message so implementation detail never reaches the caller.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            Self::PaymentProviderError(_) => "Payment provider request failed".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

/// API-boundary error for handlers that fail before reaching a service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized")]
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::ServiceError(err) => (err.status_code(), err.response_message()),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        };

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::not_found("id", "invalid product id").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::validation("product name", "already exists").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Unauthorized("no session".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden("admins only".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::EmptyContent {
                field: "file".into(),
                message: "file is empty".into()
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::PaymentProviderError("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::InternalError("connection string leaked".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::PaymentProviderError("secret key rejected".into()).response_message(),
            "Payment provider request failed"
        );
        assert_eq!(
            ServiceError::not_found("orderId", "order does not exist").response_message(),
            "orderId: order does not exist"
        );
    }

    #[tokio::test]
    async fn error_response_body_renders_envelope() {
        let response = ServiceError::validation("product name", "already exists").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.error, "Bad Request");
        assert!(payload.message.contains("product name"));
    }
}
