use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use souk_payment::gateway::{GatewayError, GatewayPaymentDetails, PaymentGateway};
use souk_shared::money::to_minor_units;
use std::time::Duration;
use tracing::debug;

use crate::app_config::GatewayConfig;

/// HTTP client for the hosted payment gateway. The gateway's REST API
/// deals in minor currency units (paise, cents) and authenticates every
/// call with the key pair over basic auth.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpGateway {
    pub fn new(cfg: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            key_id: cfg.key_id.clone(),
            key_secret: cfg.key_secret.clone(),
        })
    }

    fn minor_units(amount: Decimal) -> Result<i64, GatewayError> {
        to_minor_units(amount).ok_or_else(|| "amount does not fit the gateway's minor units".into())
    }
}

#[derive(Debug, Deserialize)]
struct OrderCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RefundCreated {
    id: String,
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
        receipt: &str,
        notes: serde_json::Value,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "amount": Self::minor_units(amount)?,
            "currency": currency,
            "receipt": receipt,
            "notes": notes,
            "payment_capture": 1,
        });
        let created: OrderCreated = self
            .http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(order_ref = %created.id, receipt = %receipt, "gateway order opened");
        Ok(created.id)
    }

    async fn payment_details(
        &self,
        payment_ref: &str,
    ) -> Result<GatewayPaymentDetails, GatewayError> {
        let details: GatewayPaymentDetails = self
            .http
            .get(format!("{}/v1/payments/{}", self.base_url, payment_ref))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(details)
    }

    async fn refund(
        &self,
        payment_ref: &str,
        amount: Decimal,
        notes: serde_json::Value,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "amount": Self::minor_units(amount)?,
            "notes": notes,
        });
        let refund: RefundCreated = self
            .http
            .post(format!(
                "{}/v1/payments/{}/refund",
                self.base_url, payment_ref
            ))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(refund_ref = %refund.id, payment_ref = %payment_ref, "gateway refund issued");
        Ok(refund.id)
    }
}
