use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

/// Header the edge proxy stamps with the authenticated user's id after it
/// has verified the session. This service trusts it and only decides what
/// that user may see or change.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Identity of the caller, extracted from `X-User-Id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub Uuid);

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::AuthenticationError(format!("Missing {} header", USER_ID_HEADER))
            })?;

        let id = Uuid::parse_str(raw).map_err(|_| {
            AppError::AuthenticationError(format!("{} must be a UUID", USER_ID_HEADER))
        })?;

        Ok(CallerId(id))
    }
}
