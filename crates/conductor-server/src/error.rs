use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use conductor_core::models::{CoreError, CoreErrorKind};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("missing caller identity: set the X-User-Id header")]
    MissingIdentity,

    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    kind: &'a str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(error) => status_for(error.kind),
            ApiError::MissingIdentity => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Core(error) => kind_label(error.kind),
            ApiError::MissingIdentity => "unauthenticated",
            ApiError::BadRequest(_) => "bad_request",
        }
    }
}

pub fn status_for(kind: CoreErrorKind) -> StatusCode {
    match kind {
        CoreErrorKind::Validation | CoreErrorKind::InvalidStateTransition => {
            StatusCode::BAD_REQUEST
        }
        CoreErrorKind::NotFound => StatusCode::NOT_FOUND,
        CoreErrorKind::AccessDenied => StatusCode::FORBIDDEN,
        CoreErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        CoreErrorKind::DuplicateId
        | CoreErrorKind::Execution
        | CoreErrorKind::Cancelled
        | CoreErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn kind_label(kind: CoreErrorKind) -> &'static str {
    match kind {
        CoreErrorKind::Validation => "validation",
        CoreErrorKind::NotFound => "not_found",
        CoreErrorKind::AccessDenied => "access_denied",
        CoreErrorKind::InvalidStateTransition => "invalid_state_transition",
        CoreErrorKind::DuplicateId => "duplicate_id",
        CoreErrorKind::Execution => "execution",
        CoreErrorKind::Cancelled => "cancelled",
        CoreErrorKind::Timeout => "timeout",
        CoreErrorKind::Internal => "internal",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Core(error) => error.message.clone(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %message, "request rejected");
        }

        let body = ErrorBody {
            error: &message,
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}
