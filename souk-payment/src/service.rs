use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use souk_booking::{Booking, BookingChange, BookingStatus, BookingStore, PaymentState};
use souk_core::lock::{slot_key, SlotLock};
use souk_core::{CoreError, CoreResult};
use souk_shared::money::round_minor;
use tracing::{info, warn};
use uuid::Uuid;

use crate::fees::{FeeBreakdown, FeeRates};
use crate::gateway::PaymentGateway;
use crate::models::{Payment, PaymentStatus};
use crate::signature;
use crate::store::{CaptureUpdate, FailureUpdate, PaymentStore, RefundUpdate};
use crate::webhook::WebhookEnvelope;

/// Secrets and rates the orchestrator works with.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub currency: String,
    /// Shared secret for client capture callbacks.
    pub key_secret: String,
    /// Shared secret for server-to-server webhooks.
    pub webhook_secret: String,
    pub rates: FeeRates,
    /// TTL for the slot lease taken when reopening a failed booking.
    pub slot_lock_ttl: Duration,
}

/// What a client needs to start the gateway checkout.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOrder {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub order_ref: String,
    pub amount: Decimal,
    pub currency: String,
    pub platform_fee: Decimal,
    pub gateway_fee: Decimal,
    pub payout_amount: Decimal,
}

/// Client-side capture callback, signed over `order_ref|payment_ref`.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureCallback {
    pub order_ref: String,
    pub payment_ref: String,
    pub signature: String,
}

/// Client-side failure callback.
#[derive(Debug, Clone, Deserialize)]
pub struct FailureNotice {
    pub order_ref: String,
    #[serde(default)]
    pub payment_ref: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Result of a refund call.
#[derive(Debug, Clone, Serialize)]
pub struct RefundOutcome {
    pub payment_id: Uuid,
    pub refund_ref: String,
    pub amount: Decimal,
    pub full: bool,
}

/// How a webhook delivery was settled. Anything short of a signature
/// failure or an infrastructure error gets acknowledged, because the
/// gateway redelivers forever on non-2xx.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebhookDisposition {
    Applied,
    AlreadyProcessed,
    Ignored,
}

/// Orchestrates money movement for bookings: gateway orders, verified
/// captures, failures, refunds, and the webhook feed. Every state change
/// funnels through the store's guarded units, so redelivered or raced
/// notifications settle as no-ops instead of double-applying.
pub struct PaymentService {
    payments: Arc<dyn PaymentStore>,
    bookings: Arc<dyn BookingStore>,
    gateway: Arc<dyn PaymentGateway>,
    lock: Arc<dyn SlotLock>,
    config: PaymentConfig,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        bookings: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        lock: Arc<dyn SlotLock>,
        config: PaymentConfig,
    ) -> Self {
        Self {
            payments,
            bookings,
            gateway,
            lock,
            config,
        }
    }

    /// Opens a gateway order for a booking awaiting payment. A booking in
    /// `payment_failed` is reopened first: since it stopped holding its
    /// slot when the payment failed, the slot lease is re-taken and
    /// availability re-checked before it returns to `pending_payment`.
    pub async fn create_order(&self, booking_id: Uuid, customer_id: Uuid) -> CoreResult<PaymentOrder> {
        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or(CoreError::NotFound("booking"))?;
        if booking.customer_id != customer_id {
            return Err(CoreError::NotFound("booking"));
        }

        let booking = match booking.status {
            BookingStatus::PendingPayment => booking,
            BookingStatus::PaymentFailed => self.reopen_after_failure(booking).await?,
            other => {
                return Err(CoreError::BookingNotEligible(format!(
                    "booking is {}",
                    other
                )))
            }
        };

        if booking.total_amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(
                "booking total must be positive".to_string(),
            ));
        }
        if self.payments.open_for_booking(booking.id).await?.is_some() {
            return Err(CoreError::BookingNotEligible(
                "a payment is already open or captured for this booking".to_string(),
            ));
        }

        let fees = FeeBreakdown::compute(booking.total_amount, &self.config.rates);
        let receipt = format!("booking_{}_{}", booking.id.simple(), Utc::now().timestamp());
        let notes = serde_json::json!({
            "booking_id": booking.id,
            "customer_id": booking.customer_id,
            "provider_id": booking.provider_id,
        });
        let order_ref = self
            .gateway
            .create_order(booking.total_amount, &self.config.currency, &receipt, notes)
            .await
            .map_err(|e| CoreError::Gateway(e.to_string()))?;

        let payment = Payment::new(&booking, order_ref, self.config.currency.clone(), &fees);
        if !self.payments.insert_if_unblocked(&payment).await? {
            // Lost the race with a parallel order for the same booking.
            return Err(CoreError::BookingNotEligible(
                "a payment is already open or captured for this booking".to_string(),
            ));
        }

        info!(
            payment_id = %payment.id,
            booking_id = %booking.id,
            order_ref = %payment.order_ref,
            amount = %payment.amount,
            "payment order created"
        );
        Ok(PaymentOrder {
            payment_id: payment.id,
            booking_id: booking.id,
            order_ref: payment.order_ref,
            amount: payment.amount,
            currency: payment.currency,
            platform_fee: payment.platform_fee,
            gateway_fee: payment.gateway_fee,
            payout_amount: payment.payout_amount,
        })
    }

    async fn reopen_after_failure(&self, booking: Booking) -> CoreResult<Booking> {
        let key = slot_key(booking.listing_id, booking.start_at);
        let token = self
            .lock
            .acquire(&key, self.config.slot_lock_ttl)
            .await?
            .ok_or(CoreError::SlotContended)?;

        let result = self.reopen_under_lease(&booking).await;

        if let Err(err) = self.lock.release(&key, &token).await {
            warn!(key = %key, error = %err, "slot lease release failed, ttl will reap it");
        }

        let change = result?;
        let mut reopened = booking;
        reopened.apply_change(&change);
        Ok(reopened)
    }

    async fn reopen_under_lease(&self, booking: &Booking) -> CoreResult<BookingChange> {
        // The failed booking stopped occupying its slot, so someone else
        // may have taken it while the customer sorted their card out.
        let conflicts = self
            .bookings
            .count_occupying_overlaps(booking.listing_id, booking.start_at, booking.end_at)
            .await?;
        if conflicts > 0 {
            return Err(CoreError::BookingConflict);
        }

        let mut change = BookingChange::new(BookingStatus::PendingPayment, Utc::now());
        change.payment_status = Some(PaymentState::Pending);
        if !self
            .bookings
            .transition(booking.id, BookingStatus::PaymentFailed, &change)
            .await?
        {
            return Err(CoreError::BookingNotEligible(
                "booking changed while reopening payment".to_string(),
            ));
        }
        info!(booking_id = %booking.id, "booking reopened for payment retry");
        Ok(change)
    }

    /// Verifies and applies a client capture callback. The signature check
    /// fails closed before any lookup happens. Replays of an already
    /// captured payment return it untouched.
    pub async fn confirm_capture(&self, cb: &CaptureCallback) -> CoreResult<Payment> {
        let message = signature::capture_message(&cb.order_ref, &cb.payment_ref);
        if !signature::verify(&self.config.key_secret, message.as_bytes(), &cb.signature) {
            warn!(order_ref = %cb.order_ref, "capture callback failed signature verification");
            return Err(CoreError::SignatureInvalid);
        }
        let (payment, _) = self.record_capture(&cb.order_ref, &cb.payment_ref).await?;
        Ok(payment)
    }

    async fn record_capture(
        &self,
        order_ref: &str,
        payment_ref: &str,
    ) -> CoreResult<(Payment, bool)> {
        let payment = self
            .payments
            .get_by_order_ref(order_ref)
            .await?
            .ok_or(CoreError::NotFound("payment"))?;
        match payment.status {
            PaymentStatus::Captured | PaymentStatus::Refunded => {
                info!(payment_id = %payment.id, "capture replay, nothing to do");
                return Ok((payment, false));
            }
            PaymentStatus::Failed => {
                return Err(CoreError::InvalidTransition {
                    from: payment.status.to_string(),
                    to: PaymentStatus::Captured.to_string(),
                });
            }
            PaymentStatus::Created => {}
        }

        let details = self
            .gateway
            .payment_details(payment_ref)
            .await
            .map_err(|e| CoreError::Gateway(e.to_string()))?;

        let update = CaptureUpdate {
            payment_ref: payment_ref.to_string(),
            method: details.method,
            bank: details.bank,
            wallet: details.wallet,
            at: Utc::now(),
        };
        let outcome = self.payments.capture(payment.id, &update).await?;
        if !outcome.payment_moved {
            // Another delivery won the race; re-read for the settled answer.
            let current = self
                .payments
                .get(payment.id)
                .await?
                .ok_or(CoreError::NotFound("payment"))?;
            if current.status == PaymentStatus::Captured {
                return Ok((current, false));
            }
            return Err(CoreError::InvalidTransition {
                from: current.status.to_string(),
                to: PaymentStatus::Captured.to_string(),
            });
        }
        if !outcome.booking_moved {
            warn!(
                payment_id = %payment.id,
                booking_id = %payment.booking_id,
                "capture recorded but booking was not pending, likely cancelled mid-payment"
            );
        }

        info!(payment_id = %payment.id, booking_id = %payment.booking_id, "payment captured");
        let settled = self
            .payments
            .get(payment.id)
            .await?
            .ok_or(CoreError::NotFound("payment"))?;
        Ok((settled, true))
    }

    /// Applies a failure notice. Idempotent: a payment already failed (or
    /// since captured) is returned untouched.
    pub async fn handle_failure(&self, notice: &FailureNotice) -> CoreResult<Payment> {
        let (payment, _) = self.record_failure(notice).await?;
        Ok(payment)
    }

    async fn record_failure(&self, notice: &FailureNotice) -> CoreResult<(Payment, bool)> {
        let payment = self
            .payments
            .get_by_order_ref(&notice.order_ref)
            .await?
            .ok_or(CoreError::NotFound("payment"))?;
        match payment.status {
            PaymentStatus::Failed => {
                info!(payment_id = %payment.id, "failure replay, nothing to do");
                return Ok((payment, false));
            }
            PaymentStatus::Captured | PaymentStatus::Refunded => {
                warn!(
                    payment_id = %payment.id,
                    "failure notice for a settled payment ignored"
                );
                return Ok((payment, false));
            }
            PaymentStatus::Created => {}
        }

        let update = FailureUpdate {
            payment_ref: notice.payment_ref.clone(),
            error_code: notice.error_code.clone(),
            error_description: notice.error_description.clone(),
            at: Utc::now(),
        };
        let outcome = self.payments.fail(payment.id, &update).await?;
        if !outcome.payment_moved {
            // A capture raced past us; the failure notice is moot.
            let current = self
                .payments
                .get(payment.id)
                .await?
                .ok_or(CoreError::NotFound("payment"))?;
            return Ok((current, false));
        }
        if !outcome.booking_moved {
            warn!(
                payment_id = %payment.id,
                booking_id = %payment.booking_id,
                "failure recorded but booking was not pending"
            );
        }

        info!(
            payment_id = %payment.id,
            error_code = notice.error_code.as_deref().unwrap_or("unknown"),
            "payment failed"
        );
        let settled = self
            .payments
            .get(payment.id)
            .await?
            .ok_or(CoreError::NotFound("payment"))?;
        Ok((settled, true))
    }

    /// Refunds part or all of a captured payment. The gateway call happens
    /// first; only a confirmed gateway refund is recorded. A full refund
    /// moves the payment to `refunded` and the booking with it; a partial
    /// refund stamps the fields and leaves both statuses alone.
    pub async fn initiate_refund(
        &self,
        payment_id: Uuid,
        amount: Option<Decimal>,
        reason: &str,
    ) -> CoreResult<RefundOutcome> {
        let payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or(CoreError::NotFound("payment"))?;
        if payment.status != PaymentStatus::Captured {
            return Err(CoreError::InvalidTransition {
                from: payment.status.to_string(),
                to: PaymentStatus::Refunded.to_string(),
            });
        }

        let amount = round_minor(amount.unwrap_or(payment.amount));
        if amount <= Decimal::ZERO || amount > payment.amount {
            return Err(CoreError::InvalidAmount(format!(
                "refund must be positive and at most {}",
                payment.amount
            )));
        }
        let payment_ref = payment
            .payment_ref
            .clone()
            .ok_or_else(|| CoreError::Gateway("captured payment has no payment reference".to_string()))?;

        let notes = serde_json::json!({
            "reason": reason,
            "booking_id": payment.booking_id,
        });
        let refund_ref = self
            .gateway
            .refund(&payment_ref, amount, notes)
            .await
            .map_err(|e| CoreError::Gateway(e.to_string()))?;

        let full = amount == payment.amount;
        let update = RefundUpdate {
            refund_ref: refund_ref.clone(),
            amount,
            full,
            at: Utc::now(),
        };
        let outcome = self.payments.record_refund(payment.id, &update).await?;
        if !outcome.payment_moved {
            // The gateway refund went through but our row moved underneath
            // us. Keep the reference loud in the logs for the operators.
            warn!(
                payment_id = %payment.id,
                refund_ref = %refund_ref,
                "gateway refund issued but payment row did not update"
            );
        }
        if full && !outcome.booking_moved {
            warn!(
                booking_id = %payment.booking_id,
                "full refund recorded but booking could not move to refunded"
            );
        }

        info!(
            payment_id = %payment.id,
            amount = %amount,
            full,
            "refund initiated"
        );
        Ok(RefundOutcome {
            payment_id: payment.id,
            refund_ref,
            amount,
            full,
        })
    }

    /// Verifies a webhook delivery and routes it. Unknown events, unknown
    /// orders and stale transitions are acknowledged and dropped; only bad
    /// signatures and infrastructure failures surface as errors.
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature_hex: &str,
    ) -> CoreResult<WebhookDisposition> {
        if !signature::verify(&self.config.webhook_secret, body, signature_hex) {
            warn!("webhook failed signature verification");
            return Err(CoreError::SignatureInvalid);
        }

        let envelope = match serde_json::from_slice::<WebhookEnvelope>(body) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "webhook body did not parse, acknowledging anyway");
                return Ok(WebhookDisposition::Ignored);
            }
        };

        match envelope.event.as_str() {
            "payment.captured" => {
                let entity = match envelope.payload.payment {
                    Some(wrap) => wrap.entity,
                    None => {
                        warn!("capture event without a payment entity");
                        return Ok(WebhookDisposition::Ignored);
                    }
                };
                match self.record_capture(&entity.order_id, &entity.id).await {
                    Ok((_, true)) => Ok(WebhookDisposition::Applied),
                    Ok((_, false)) => Ok(WebhookDisposition::AlreadyProcessed),
                    Err(err @ (CoreError::Gateway(_) | CoreError::Storage(_))) => Err(err),
                    Err(err) => {
                        warn!(order_ref = %entity.order_id, error = %err, "capture webhook dropped");
                        Ok(WebhookDisposition::Ignored)
                    }
                }
            }
            "payment.failed" => {
                let entity = match envelope.payload.payment {
                    Some(wrap) => wrap.entity,
                    None => {
                        warn!("failure event without a payment entity");
                        return Ok(WebhookDisposition::Ignored);
                    }
                };
                let notice = FailureNotice {
                    order_ref: entity.order_id.clone(),
                    payment_ref: Some(entity.id),
                    error_code: entity.error_code,
                    error_description: entity.error_description,
                };
                match self.record_failure(&notice).await {
                    Ok((_, true)) => Ok(WebhookDisposition::Applied),
                    Ok((_, false)) => Ok(WebhookDisposition::AlreadyProcessed),
                    Err(err @ (CoreError::Gateway(_) | CoreError::Storage(_))) => Err(err),
                    Err(err) => {
                        warn!(order_ref = %notice.order_ref, error = %err, "failure webhook dropped");
                        Ok(WebhookDisposition::Ignored)
                    }
                }
            }
            other => {
                info!(event = other, "unhandled webhook event acknowledged");
                Ok(WebhookDisposition::Ignored)
            }
        }
    }

    /// Fetches a payment. With an accessor, only parties to the linked
    /// booking may see it.
    pub async fn get_payment(&self, id: Uuid, accessor: Option<Uuid>) -> CoreResult<Payment> {
        let payment = self
            .payments
            .get(id)
            .await?
            .ok_or(CoreError::NotFound("payment"))?;
        if let Some(user) = accessor {
            let booking = self
                .bookings
                .get(payment.booking_id)
                .await?
                .ok_or(CoreError::NotFound("booking"))?;
            if booking.customer_id != user && booking.provider_id != user {
                return Err(CoreError::NotFound("payment"));
            }
        }
        Ok(payment)
    }

    /// Repairs bookings stranded by a crash between the halves of a
    /// capture: payment captured, booking still pending. Returns how many
    /// bookings were confirmed. Runs at startup and is safe to run anytime.
    pub async fn reconcile(&self) -> CoreResult<usize> {
        let stranded = self.payments.captured_with_pending_booking().await?;
        let mut repaired = 0;
        for payment in stranded {
            let mut change =
                BookingChange::new(BookingStatus::Confirmed, payment.captured_at.unwrap_or_else(Utc::now));
            change.payment_status = Some(PaymentState::Paid);
            if self
                .bookings
                .transition(payment.booking_id, BookingStatus::PendingPayment, &change)
                .await?
            {
                warn!(
                    booking_id = %payment.booking_id,
                    payment_id = %payment.id,
                    "repaired booking left behind by an interrupted capture"
                );
                repaired += 1;
            }
        }
        Ok(repaired)
    }
}
