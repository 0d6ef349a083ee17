use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::Payment;

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of a capture/failure/refund write unit. The payment half and
/// the booking half report separately so the orchestrator can log a
/// booking that had already moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitOutcome {
    /// The payment row's status guard matched and it was stamped.
    pub payment_moved: bool,
    /// The linked booking moved in the same unit.
    pub booking_moved: bool,
}

/// Fields stamped when a capture lands.
#[derive(Debug, Clone)]
pub struct CaptureUpdate {
    pub payment_ref: String,
    pub method: Option<String>,
    pub bank: Option<String>,
    pub wallet: Option<String>,
    pub at: DateTime<Utc>,
}

/// Fields stamped when the gateway reports a failed attempt.
#[derive(Debug, Clone)]
pub struct FailureUpdate {
    pub payment_ref: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub at: DateTime<Utc>,
}

/// Fields stamped when a refund is issued. `full` decides whether the
/// payment and booking leave their settled states.
#[derive(Debug, Clone)]
pub struct RefundUpdate {
    pub refund_ref: String,
    pub amount: Decimal,
    pub full: bool,
    pub at: DateTime<Utc>,
}

/// Persistence seam for payments. Implementations must apply each of the
/// capture/fail/refund operations as one unit: a crash can never leave the
/// payment stamped but the booking untouched within a unit that reported
/// both halves moved.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert unless the booking already has a payment that blocks new
    /// orders (open or captured). Returns whether the row went in.
    async fn insert_if_unblocked(&self, payment: &Payment) -> Result<bool, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Payment>, StoreError>;

    async fn get_by_order_ref(&self, order_ref: &str) -> Result<Option<Payment>, StoreError>;

    /// The payment currently blocking new orders for this booking, if any.
    async fn open_for_booking(&self, booking_id: Uuid) -> Result<Option<Payment>, StoreError>;

    /// created -> captured, and the booking pending_payment -> confirmed
    /// with its payment mirror set to paid, as one unit.
    async fn capture(&self, payment_id: Uuid, update: &CaptureUpdate)
        -> Result<UnitOutcome, StoreError>;

    /// created -> failed, and the booking pending_payment -> payment_failed
    /// with its mirror set to failed, as one unit.
    async fn fail(&self, payment_id: Uuid, update: &FailureUpdate)
        -> Result<UnitOutcome, StoreError>;

    /// Stamp refund fields on a captured payment. A full refund also moves
    /// captured -> refunded and the booking to refunded in the same unit;
    /// a partial refund leaves both statuses where they are.
    async fn record_refund(
        &self,
        payment_id: Uuid,
        update: &RefundUpdate,
    ) -> Result<UnitOutcome, StoreError>;

    /// Captured payments whose booking still reads pending_payment, i.e.
    /// the wreckage of a capture interrupted between its halves.
    async fn captured_with_pending_booking(&self) -> Result<Vec<Payment>, StoreError>;
}
