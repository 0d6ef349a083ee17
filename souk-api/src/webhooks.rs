use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use souk_core::CoreError;
use souk_payment::WebhookDisposition;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the gateway's HMAC over the raw request body.
pub const SIGNATURE_HEADER: &str = "X-Gateway-Signature";

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/gateway", post(gateway_webhook))
}

#[derive(Debug, Serialize)]
struct WebhookResponse {
    status: WebhookDisposition,
}

/// POST /v1/webhooks/gateway
/// Server-to-server payment events. The signature is verified over the raw
/// bytes, so the body must not be parsed before verification. Anything the
/// orchestrator settles, even by dropping it, is acknowledged with a 200 so
/// the gateway stops redelivering.
async fn gateway_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(CoreError::SignatureInvalid)?;

    let status = state.payments.handle_webhook(&body, signature).await?;
    Ok(Json(WebhookResponse { status }))
}
