use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use souk_catalog::ListingSummary;
use uuid::Uuid;

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    PaymentFailed,
    Refunded,
    Reviewed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::PaymentFailed => "payment_failed",
            BookingStatus::Refunded => "refunded",
            BookingStatus::Reviewed => "reviewed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == raw)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement mirror kept on the booking row so list views never join the
/// payments table. The payment orchestrator keeps it in sync.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Paid => "paid",
            PaymentState::Failed => "failed",
            PaymentState::Refunded => "refunded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [
            PaymentState::Pending,
            PaymentState::Paid,
            PaymentState::Failed,
            PaymentState::Refunded,
        ]
        .into_iter()
        .find(|state| state.as_str() == raw)
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer's reservation of a listing slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub payment_status: PaymentState,
    /// Quoted total at creation time. Never recomputed afterwards.
    pub total_amount: Decimal,
    /// Deposit snapshotted from the listing when the customer asked for one.
    pub deposit_amount: Decimal,
    pub package: Option<String>,
    pub is_emergency: bool,
    pub customer_notes: Option<String>,
    pub status_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    /// Refund entitlement stamped at cancellation. The actual money moves
    /// through payment orchestration.
    pub refund_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub status_updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(
        customer_id: Uuid,
        listing: &ListingSummary,
        req: &BookingRequest,
        total_amount: Decimal,
        deposit_amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            listing_id: listing.id,
            customer_id,
            provider_id: listing.provider_id,
            start_at: req.start_at,
            end_at: req.end_at,
            status: BookingStatus::PendingPayment,
            payment_status: PaymentState::Pending,
            total_amount,
            deposit_amount,
            package: req.package.clone(),
            is_emergency: req.is_emergency,
            customer_notes: req.customer_notes.clone(),
            status_notes: None,
            cancellation_reason: None,
            refund_amount: None,
            created_at: now,
            status_updated_at: now,
            confirmed_at: None,
            cancelled_at: None,
        }
    }
}

/// Payload to create a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub listing_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub is_emergency: bool,
    #[serde(default)]
    pub deposit_required: bool,
    #[serde(default)]
    pub customer_notes: Option<String>,
}

/// Filter for the customer/provider list views
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub limit: Option<i64>,
}
