use serde::Deserialize;

/// Envelope the gateway posts to the webhook endpoint. The signature header
/// covers the raw body, so parsing happens only after verification.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<WebhookPaymentWrap>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPaymentWrap {
    pub entity: WebhookPaymentEntity,
}

/// The payment entity embedded in capture and failure events.
#[derive(Debug, Deserialize)]
pub struct WebhookPaymentEntity {
    /// Gateway payment reference.
    pub id: String,
    /// Gateway order reference this payment settles.
    pub order_id: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}
