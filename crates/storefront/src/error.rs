//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::CommerceError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog, cart or order operation failed.
    #[error(transparent)]
    Commerce(#[from] CommerceError),

    /// Bad request from client (malformed body, path or query).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Commerce(err) => match err {
                CommerceError::NotFound(_) => StatusCode::NOT_FOUND,
                CommerceError::OutOfStock(_)
                | CommerceError::InsufficientStock(_)
                | CommerceError::IllegalTransition { .. }
                | CommerceError::Conflict(_) => StatusCode::CONFLICT,
                CommerceError::InvalidQuantity(_)
                | CommerceError::InvalidStatus(_)
                | CommerceError::VariantMismatch { .. }
                | CommerceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CommerceError::EmptyCart | CommerceError::InvalidCheckout(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                CommerceError::Forbidden => StatusCode::FORBIDDEN,
                CommerceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        Self::Commerce(err.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called once the request identity has been resolved, to associate errors
/// with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::{OrderStatus, QuantityError, VariantId};

    use super::*;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::from(CommerceError::NotFound("product"));
        assert_eq!(err.to_string(), "product not found");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(CommerceError::NotFound("order")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CommerceError::OutOfStock("Wool Coat".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CommerceError::InsufficientStock(VariantId::generate())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CommerceError::IllegalTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CommerceError::InvalidQuantity(QuantityError::TooSmall(0))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CommerceError::EmptyCart),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(get_status(CommerceError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::Backend("disk full".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let response =
            AppError::from(RepositoryError::Backend("secret detail".to_string())).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_client_errors_carry_message() {
        let response = AppError::from(CommerceError::EmptyCart).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["message"], "cart is empty");
    }
}
