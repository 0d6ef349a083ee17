use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use souk_booking::Booking;
use uuid::Uuid;

use crate::fees::FeeBreakdown;

/// Payment status in the capture lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Created,
    Captured,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "created",
            PaymentStatus::Captured => "captured",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [
            PaymentStatus::Created,
            PaymentStatus::Captured,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
        ]
        .into_iter()
        .find(|status| status.as_str() == raw)
    }

    /// An open or settled payment blocks a new order for the same booking.
    /// Failed and refunded payments do not; retries create fresh rows.
    pub fn blocks_new_order(&self) -> bool {
        matches!(self, PaymentStatus::Created | PaymentStatus::Captured)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempt to collect a booking's total through the gateway. Rows are
/// never deleted; failed attempts stay behind as the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub platform_fee: Decimal,
    pub gateway_fee: Decimal,
    /// What the provider receives: amount minus both fees, exactly.
    pub payout_amount: Decimal,
    pub status: PaymentStatus,
    /// Gateway order reference, assigned at creation.
    pub order_ref: String,
    /// Gateway payment reference, known once the customer pays.
    pub payment_ref: Option<String>,
    pub method: Option<String>,
    pub bank: Option<String>,
    pub wallet: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub refund_ref: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub captured_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn new(booking: &Booking, order_ref: String, currency: String, fees: &FeeBreakdown) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            amount: fees.amount,
            currency,
            platform_fee: fees.platform_fee,
            gateway_fee: fees.gateway_fee,
            payout_amount: fees.payout_amount,
            status: PaymentStatus::Created,
            order_ref,
            payment_ref: None,
            method: None,
            bank: None,
            wallet: None,
            error_code: None,
            error_description: None,
            refund_ref: None,
            refund_amount: None,
            created_at: Utc::now(),
            captured_at: None,
            failed_at: None,
            refunded_at: None,
        }
    }
}
