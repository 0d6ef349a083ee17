use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use souk_booking::memory::BookingTable;
use souk_booking::{BookingChange, BookingStatus, PaymentState};

use crate::models::{Payment, PaymentStatus};
use crate::store::{
    CaptureUpdate, FailureUpdate, PaymentStore, RefundUpdate, StoreError, UnitOutcome,
};

/// In-memory payment store for tests and single-node runs. It shares the
/// booking table with `MemoryBookingStore`, and holds both write guards
/// while applying a unit, so capture/failure/refund land atomically the way
/// the SQL store's transactions do.
pub struct MemoryPaymentStore {
    payments: RwLock<HashMap<Uuid, Payment>>,
    bookings: BookingTable,
}

impl MemoryPaymentStore {
    pub fn new(bookings: BookingTable) -> Self {
        Self {
            payments: RwLock::new(HashMap::new()),
            bookings,
        }
    }
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn insert_if_unblocked(&self, payment: &Payment) -> Result<bool, StoreError> {
        let mut payments = self.payments.write().await;
        let blocked = payments
            .values()
            .any(|p| p.booking_id == payment.booking_id && p.status.blocks_new_order());
        if blocked {
            return Ok(false);
        }
        payments.insert(payment.id, payment.clone());
        Ok(true)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Payment>, StoreError> {
        Ok(self.payments.read().await.get(&id).cloned())
    }

    async fn get_by_order_ref(&self, order_ref: &str) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| p.order_ref == order_ref)
            .cloned())
    }

    async fn open_for_booking(&self, booking_id: Uuid) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| p.booking_id == booking_id && p.status.blocks_new_order())
            .cloned())
    }

    async fn capture(
        &self,
        payment_id: Uuid,
        update: &CaptureUpdate,
    ) -> Result<UnitOutcome, StoreError> {
        let mut payments = self.payments.write().await;
        let mut bookings = self.bookings.write().await;

        let payment = match payments.get_mut(&payment_id) {
            Some(p) if p.status == PaymentStatus::Created => p,
            _ => {
                return Ok(UnitOutcome {
                    payment_moved: false,
                    booking_moved: false,
                })
            }
        };
        payment.status = PaymentStatus::Captured;
        payment.payment_ref = Some(update.payment_ref.clone());
        payment.method = update.method.clone();
        payment.bank = update.bank.clone();
        payment.wallet = update.wallet.clone();
        payment.captured_at = Some(update.at);

        let booking_moved = match bookings.get_mut(&payment.booking_id) {
            Some(b) if b.status == BookingStatus::PendingPayment => {
                let mut change = BookingChange::new(BookingStatus::Confirmed, update.at);
                change.payment_status = Some(PaymentState::Paid);
                b.apply_change(&change);
                true
            }
            _ => false,
        };

        Ok(UnitOutcome {
            payment_moved: true,
            booking_moved,
        })
    }

    async fn fail(
        &self,
        payment_id: Uuid,
        update: &FailureUpdate,
    ) -> Result<UnitOutcome, StoreError> {
        let mut payments = self.payments.write().await;
        let mut bookings = self.bookings.write().await;

        let payment = match payments.get_mut(&payment_id) {
            Some(p) if p.status == PaymentStatus::Created => p,
            _ => {
                return Ok(UnitOutcome {
                    payment_moved: false,
                    booking_moved: false,
                })
            }
        };
        payment.status = PaymentStatus::Failed;
        if let Some(payment_ref) = &update.payment_ref {
            payment.payment_ref = Some(payment_ref.clone());
        }
        payment.error_code = update.error_code.clone();
        payment.error_description = update.error_description.clone();
        payment.failed_at = Some(update.at);

        let booking_moved = match bookings.get_mut(&payment.booking_id) {
            Some(b) if b.status == BookingStatus::PendingPayment => {
                let mut change = BookingChange::new(BookingStatus::PaymentFailed, update.at);
                change.payment_status = Some(PaymentState::Failed);
                b.apply_change(&change);
                true
            }
            _ => false,
        };

        Ok(UnitOutcome {
            payment_moved: true,
            booking_moved,
        })
    }

    async fn record_refund(
        &self,
        payment_id: Uuid,
        update: &RefundUpdate,
    ) -> Result<UnitOutcome, StoreError> {
        let mut payments = self.payments.write().await;
        let mut bookings = self.bookings.write().await;

        let payment = match payments.get_mut(&payment_id) {
            Some(p) if p.status == PaymentStatus::Captured => p,
            _ => {
                return Ok(UnitOutcome {
                    payment_moved: false,
                    booking_moved: false,
                })
            }
        };
        payment.refund_ref = Some(update.refund_ref.clone());
        payment.refund_amount = Some(update.amount);
        payment.refunded_at = Some(update.at);

        let mut booking_moved = false;
        if update.full {
            payment.status = PaymentStatus::Refunded;
            booking_moved = match bookings.get_mut(&payment.booking_id) {
                Some(b) if b.status.can_transition(BookingStatus::Refunded) => {
                    let mut change = BookingChange::new(BookingStatus::Refunded, update.at);
                    change.payment_status = Some(PaymentState::Refunded);
                    b.apply_change(&change);
                    true
                }
                _ => false,
            };
        }

        Ok(UnitOutcome {
            payment_moved: true,
            booking_moved,
        })
    }

    async fn captured_with_pending_booking(&self) -> Result<Vec<Payment>, StoreError> {
        let payments = self.payments.read().await;
        let bookings = self.bookings.read().await;
        Ok(payments
            .values()
            .filter(|p| p.status == PaymentStatus::Captured)
            .filter(|p| {
                bookings
                    .get(&p.booking_id)
                    .map(|b| b.status == BookingStatus::PendingPayment)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}
