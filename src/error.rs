//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::ledger::LedgerError;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (connection error, query error, constraint).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No valid session cookie accompanied the request.
    #[error("Authentication required")]
    NotAuthenticated,

    /// Email/password pair did not match.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The authenticated user has no bank account.
    #[error("Account not found")]
    AccountNotFound,

    /// Account has insufficient balance for the requested operation.
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// Request body or parameters are malformed.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Input is well-formed but violates a business rule.
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("A user with this email already exists")]
    EmailTaken,

    /// The `Host` header is not in the allowed hosts list.
    #[error("Invalid Host header")]
    DisallowedHost,

    /// A background job failed while running eagerly.
    #[error("Task failed: {0}")]
    Task(String),

    #[error("Password hashing failed")]
    PasswordHash,
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance => AppError::InsufficientBalance,
            other => AppError::Validation(vec![other.to_string()]),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{field}: {}", e.code),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages)
    }
}

/// Internal error text attached to 5xx responses as a response extension.
///
/// Never serialized by default; see
/// [`crate::middleware::debug::expose_error_detail`].
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// `Validation` errors additionally carry a `details` array.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let detail = match &self {
            AppError::Database(_) | AppError::Task(_) | AppError::PasswordHash => {
                Some(self.to_string())
            }
            _ => None,
        };

        let (status, code, message) = match self {
            AppError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                "not_authenticated",
                self.to_string(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            AppError::AccountNotFound => {
                (StatusCode::NOT_FOUND, "account_not_found", self.to_string())
            }
            AppError::InsufficientBalance => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_balance",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Validation(ref details) => {
                let body = Json(json!({
                    "error": {
                        "code": "validation_failed",
                        "message": self.to_string(),
                        "details": details,
                    }
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::EmailTaken => (StatusCode::CONFLICT, "email_taken", self.to_string()),
            AppError::DisallowedHost => {
                (StatusCode::BAD_REQUEST, "disallowed_host", self.to_string())
            }
            AppError::Database(ref err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Task(ref err) => {
                tracing::error!(error = %err, "task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::PasswordHash => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        let mut response = (status, body).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (AppError::NotAuthenticated, StatusCode::UNAUTHORIZED),
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AppError::AccountNotFound, StatusCode::NOT_FOUND),
            (AppError::InsufficientBalance, StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Validation(vec![]), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::EmailTaken, StatusCode::CONFLICT),
            (AppError::DisallowedHost, StatusCode::BAD_REQUEST),
            (AppError::Task("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                AppError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn internal_errors_keep_detail_out_of_the_body() {
        let response = AppError::Task("relay rejected message with status 503".into()).into_response();

        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert_eq!(detail.0, "Task failed: relay rejected message with status 503");

        assert!(
            AppError::AccountNotFound
                .into_response()
                .extensions()
                .get::<ErrorDetail>()
                .is_none()
        );
    }

    #[test]
    fn field_validation_errors_become_messages() {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "email",
            validator::ValidationError::new("email").with_message("Enter a valid email address.".into()),
        );
        errors.add("last_name", validator::ValidationError::new("length"));

        match AppError::from(errors) {
            AppError::Validation(messages) => assert_eq!(
                messages,
                vec!["Enter a valid email address.", "last_name: length"]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ledger_errors_map_to_app_errors() {
        assert!(matches!(
            AppError::from(LedgerError::InsufficientBalance),
            AppError::InsufficientBalance
        ));
        assert!(matches!(
            AppError::from(LedgerError::NonPositiveAmount),
            AppError::Validation(_)
        ));
    }
}
