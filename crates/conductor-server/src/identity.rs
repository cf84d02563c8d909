use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use conductor_core::models::OwnerId;

use crate::error::ApiError;
use crate::routes::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the principal making the request. Supplied by the
/// authentication layer in front of this service and trusted as-is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Caller(pub OwnerId);

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_ID_HEADER) else {
            return state
                .default_owner
                .map(Caller)
                .ok_or(ApiError::MissingIdentity);
        };

        raw.to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .map(|id| Caller(OwnerId(id)))
            .ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "{USER_ID_HEADER} header must be an integer user id"
                ))
            })
    }
}
