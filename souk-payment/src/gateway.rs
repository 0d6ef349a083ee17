use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

pub type GatewayError = Box<dyn std::error::Error + Send + Sync>;

/// Details the gateway reports for a collected payment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayPaymentDetails {
    pub method: Option<String>,
    pub bank: Option<String>,
    pub wallet: Option<String>,
}

/// Seam to the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open an order the customer will pay against. Returns the gateway's
    /// order reference.
    async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
        receipt: &str,
        notes: serde_json::Value,
    ) -> Result<String, GatewayError>;

    /// Fetch details for a payment the gateway has collected.
    async fn payment_details(&self, payment_ref: &str) -> Result<GatewayPaymentDetails, GatewayError>;

    /// Refund part or all of a collected payment. Returns the refund
    /// reference.
    async fn refund(
        &self,
        payment_ref: &str,
        amount: Decimal,
        notes: serde_json::Value,
    ) -> Result<String, GatewayError>;
}

/// Canned gateway for tests and offline runs. Payment refs containing
/// "outage" simulate a gateway that cannot be reached; refs containing
/// "unrefundable" reject refunds.
pub struct MockGateway;

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(
        &self,
        _amount: Decimal,
        _currency: &str,
        _receipt: &str,
        _notes: serde_json::Value,
    ) -> Result<String, GatewayError> {
        Ok(format!("order_mock_{}", Uuid::new_v4().simple()))
    }

    async fn payment_details(&self, payment_ref: &str) -> Result<GatewayPaymentDetails, GatewayError> {
        if payment_ref.contains("outage") {
            return Err("simulated gateway outage".into());
        }
        Ok(GatewayPaymentDetails {
            method: Some("card".to_string()),
            bank: None,
            wallet: None,
        })
    }

    async fn refund(
        &self,
        payment_ref: &str,
        _amount: Decimal,
        _notes: serde_json::Value,
    ) -> Result<String, GatewayError> {
        if payment_ref.contains("unrefundable") {
            return Err("simulated refund rejection".into());
        }
        Ok(format!("rfnd_mock_{}", Uuid::new_v4().simple()))
    }
}
