use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use souk_core::CoreError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    Core(CoreError),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Core(err) => {
                let status = match &err {
                    CoreError::SlotContended
                    | CoreError::BookingConflict
                    | CoreError::InvalidTransition { .. } => StatusCode::CONFLICT,
                    CoreError::InvalidInterval(_)
                    | CoreError::InvalidAmount(_)
                    | CoreError::SignatureInvalid => StatusCode::BAD_REQUEST,
                    CoreError::BookingNotEligible(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    CoreError::ListingUnavailable | CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                    CoreError::Gateway(_) => StatusCode::BAD_GATEWAY,
                    CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Internal Server Error: {}", err);
                    (status, "Internal Server Error".to_string())
                } else {
                    (status, err.to_string())
                }
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
