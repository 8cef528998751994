use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use models::errors::ModelError;
use service::auth::errors::AuthError;
use service::errors::ServiceError;

/// Error body: `{"error": ..., "details": ...}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    details: String,
}

#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub details: String,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &'static str, details: impl Into<String>) -> Self {
        Self { status, error, details: details.into() }
    }

    pub fn unauthorized(details: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", details)
    }

    pub fn forbidden(details: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", details)
    }

    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", details)
    }

    /// Log the cause and hide it from the client.
    fn internal(cause: &dyn std::fmt::Display) -> Self {
        error!(error = %cause, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "an unexpected error occurred")
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.error, details: self.details })).into_response()
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(m) => Self::bad_request(m),
            ServiceError::InvalidTransition(m) => Self::new(StatusCode::BAD_REQUEST, "invalid_transition", m),
            ServiceError::NotFound(m) => Self::new(StatusCode::NOT_FOUND, "not_found", m),
            ServiceError::Forbidden(m) => Self::forbidden(m),
            ServiceError::Unauthorized(m) => Self::unauthorized(m),
            ServiceError::Conflict(m) => Self::new(StatusCode::CONFLICT, "conflict", m),
            ServiceError::Model(ModelError::Validation(m)) => Self::bad_request(m),
            ServiceError::Model(ModelError::NotFound(what)) => {
                Self::new(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
            }
            other @ (ServiceError::Db(_) | ServiceError::Model(ModelError::Db(_))) => Self::internal(&other),
        }
    }
}

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(m) => Self::bad_request(m),
            AuthError::Conflict(_) => Self::new(StatusCode::CONFLICT, "conflict", e.to_string()),
            AuthError::NotFound => Self::new(StatusCode::NOT_FOUND, "not_found", e.to_string()),
            AuthError::Unauthorized | AuthError::Inactive => Self::unauthorized(e.to_string()),
            AuthError::TokenError(_) => Self::unauthorized("invalid or expired token"),
            AuthError::HashError(_) | AuthError::Repository(_) => {
                error!(code = e.code(), "auth failure");
                Self::internal(&e)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::InvalidTransition("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::Db("secret table".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(JsonApiError::from(err).status, status);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let e = JsonApiError::from(ServiceError::Db("relation \"user\" does not exist".into()));
        assert!(!e.details.contains("relation"));
        let e = JsonApiError::from(AuthError::Repository("pool timed out".into()));
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!e.details.contains("pool"));
    }

    #[test]
    fn inactive_login_is_unauthorized() {
        assert_eq!(JsonApiError::from(AuthError::Inactive).status, StatusCode::UNAUTHORIZED);
    }
}
