use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Booking, BookingFilter, BookingStatus, PaymentState};

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Page size applied when a list call does not ask for one.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// A guarded status change. Stores apply it only while the booking still
/// sits in the expected `from` status, so racing writers cannot both win.
#[derive(Debug, Clone)]
pub struct BookingChange {
    pub to: BookingStatus,
    pub payment_status: Option<PaymentState>,
    pub status_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub at: DateTime<Utc>,
}

impl BookingChange {
    pub fn new(to: BookingStatus, at: DateTime<Utc>) -> Self {
        Self {
            to,
            payment_status: None,
            status_notes: None,
            cancellation_reason: None,
            refund_amount: None,
            at,
        }
    }
}

impl Booking {
    /// Applies a change to an in-memory copy the same way the stores stamp
    /// rows: status, optional side fields, and the lifecycle timestamps.
    pub fn apply_change(&mut self, change: &BookingChange) {
        self.status = change.to;
        if let Some(state) = change.payment_status {
            self.payment_status = state;
        }
        if let Some(notes) = &change.status_notes {
            self.status_notes = Some(notes.clone());
        }
        if let Some(reason) = &change.cancellation_reason {
            self.cancellation_reason = Some(reason.clone());
        }
        if let Some(amount) = change.refund_amount {
            self.refund_amount = Some(amount);
        }
        self.status_updated_at = change.at;
        match change.to {
            BookingStatus::Confirmed => self.confirmed_at = Some(change.at),
            BookingStatus::Cancelled => self.cancelled_at = Some(change.at),
            _ => {}
        }
    }
}

/// Persistence seam for bookings.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Count bookings on the listing whose interval overlaps the proposal
    /// (half-open) and whose status still occupies the slot.
    async fn count_occupying_overlaps(
        &self,
        listing_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Compare-and-set: apply `change` iff the booking is still in `from`.
    /// Returns whether a row actually moved.
    async fn transition(
        &self,
        id: Uuid,
        from: BookingStatus,
        change: &BookingChange,
    ) -> Result<bool, StoreError>;

    /// Newest-first bookings made by the customer.
    async fn list_for_customer(
        &self,
        customer_id: Uuid,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Newest-first bookings against the provider's listings.
    async fn list_for_provider(
        &self,
        provider_id: Uuid,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError>;
}
