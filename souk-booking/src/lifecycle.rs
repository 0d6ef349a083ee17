//! The booking state machine. Every status write in the engine goes through
//! a store-level compare-and-set against this table; nothing mutates status
//! fields freehand.

use souk_core::{CoreError, CoreResult};

use crate::models::BookingStatus;

use BookingStatus::*;

impl BookingStatus {
    pub const ALL: [BookingStatus; 8] = [
        PendingPayment,
        Confirmed,
        InProgress,
        Completed,
        Cancelled,
        PaymentFailed,
        Refunded,
        Reviewed,
    ];

    /// The full machine, including the edges only the payment orchestrator
    /// drives (capture, failure, refund, retry after failure).
    pub fn can_transition(self, to: BookingStatus) -> bool {
        matches!(
            (self, to),
            (PendingPayment, Confirmed)
                | (PendingPayment, Cancelled)
                | (PendingPayment, PaymentFailed)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (Confirmed, Refunded)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (Completed, Reviewed)
                | (Cancelled, Refunded)
                | (PaymentFailed, PendingPayment)
        )
    }

    /// Moves a customer or provider may request directly. Payment-driven
    /// edges are deliberately absent: confirmation only ever comes from a
    /// verified capture, refunds from the refund flow.
    pub fn user_transition_allowed(self, to: BookingStatus) -> bool {
        matches!(
            (self, to),
            (PendingPayment, Cancelled)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (Completed, Reviewed)
        )
    }

    /// Statuses that hold the slot against competing bookings.
    pub fn occupies_slot(self) -> bool {
        matches!(self, PendingPayment | Confirmed | InProgress)
    }

    /// Cancellation is only open before the service starts changing hands.
    pub fn is_cancellable(self) -> bool {
        matches!(self, PendingPayment | Confirmed)
    }

    /// No outgoing edges at all.
    pub fn is_terminal(self) -> bool {
        matches!(self, Refunded | Reviewed)
    }
}

/// Checks an edge of the full machine, producing the canonical error.
pub fn ensure_transition(from: BookingStatus, to: BookingStatus) -> CoreResult<()> {
    if from.can_transition(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
