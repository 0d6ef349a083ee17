use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use souk_payment::store::{
    CaptureUpdate, FailureUpdate, PaymentStore, RefundUpdate, StoreError, UnitOutcome,
};
use souk_payment::{Payment, PaymentStatus};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PAYMENT_COLUMNS: &str = "id, booking_id, amount, currency, platform_fee, gateway_fee, \
     payout_amount, status, order_ref, payment_ref, method, bank, wallet, \
     error_code, error_description, refund_ref, refund_amount, \
     created_at, captured_at, failed_at, refunded_at";

/// Matches the partial unique index guarding one open payment per booking.
const ONE_OPEN_INDEX: &str = "payments_one_open_per_booking";

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount: Decimal,
    currency: String,
    platform_fee: Decimal,
    gateway_fee: Decimal,
    payout_amount: Decimal,
    status: String,
    order_ref: String,
    payment_ref: Option<String>,
    method: Option<String>,
    bank: Option<String>,
    wallet: Option<String>,
    error_code: Option<String>,
    error_description: Option<String>,
    refund_ref: Option<String>,
    refund_amount: Option<Decimal>,
    created_at: DateTime<Utc>,
    captured_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, StoreError> {
        let status = PaymentStatus::parse(&self.status)
            .ok_or_else(|| format!("unknown payment status '{}'", self.status))?;
        Ok(Payment {
            id: self.id,
            booking_id: self.booking_id,
            amount: self.amount,
            currency: self.currency,
            platform_fee: self.platform_fee,
            gateway_fee: self.gateway_fee,
            payout_amount: self.payout_amount,
            status,
            order_ref: self.order_ref,
            payment_ref: self.payment_ref,
            method: self.method,
            bank: self.bank,
            wallet: self.wallet,
            error_code: self.error_code,
            error_description: self.error_description,
            refund_ref: self.refund_ref,
            refund_amount: self.refund_amount,
            created_at: self.created_at,
            captured_at: self.captured_at,
            failed_at: self.failed_at,
            refunded_at: self.refunded_at,
        })
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn insert_if_unblocked(&self, payment: &Payment) -> Result<bool, StoreError> {
        // The partial unique index on (booking_id) WHERE status blocks new
        // orders is the atomic guard; a violation means an open or captured
        // payment already exists.
        let sql = format!(
            "INSERT INTO payments ({PAYMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)"
        );
        let result = sqlx::query(&sql)
            .bind(payment.id)
            .bind(payment.booking_id)
            .bind(payment.amount)
            .bind(payment.currency.as_str())
            .bind(payment.platform_fee)
            .bind(payment.gateway_fee)
            .bind(payment.payout_amount)
            .bind(payment.status.as_str())
            .bind(payment.order_ref.as_str())
            .bind(payment.payment_ref.as_deref())
            .bind(payment.method.as_deref())
            .bind(payment.bank.as_deref())
            .bind(payment.wallet.as_deref())
            .bind(payment.error_code.as_deref())
            .bind(payment.error_description.as_deref())
            .bind(payment.refund_ref.as_deref())
            .bind(payment.refund_amount)
            .bind(payment.created_at)
            .bind(payment.captured_at)
            .bind(payment.failed_at)
            .bind(payment.refunded_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(db)) if db.constraint() == Some(ONE_OPEN_INDEX) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Payment>, StoreError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PaymentRow::into_payment).transpose()
    }

    async fn get_by_order_ref(&self, order_ref: &str) -> Result<Option<Payment>, StoreError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_ref = $1");
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(order_ref)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PaymentRow::into_payment).transpose()
    }

    async fn open_for_booking(&self, booking_id: Uuid) -> Result<Option<Payment>, StoreError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE booking_id = $1 AND status IN ('created', 'captured') LIMIT 1"
        );
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PaymentRow::into_payment).transpose()
    }

    async fn capture(
        &self,
        payment_id: Uuid,
        update: &CaptureUpdate,
    ) -> Result<UnitOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let booking_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE payments \
                SET status = 'captured', payment_ref = $2, method = $3, bank = $4, \
                    wallet = $5, captured_at = $6 \
              WHERE id = $1 AND status = 'created' \
              RETURNING booking_id",
        )
        .bind(payment_id)
        .bind(update.payment_ref.as_str())
        .bind(update.method.as_deref())
        .bind(update.bank.as_deref())
        .bind(update.wallet.as_deref())
        .bind(update.at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(booking_id) = booking_id else {
            tx.rollback().await?;
            return Ok(UnitOutcome {
                payment_moved: false,
                booking_moved: false,
            });
        };

        let booking = sqlx::query(
            "UPDATE bookings \
                SET status = 'confirmed', payment_status = 'paid', \
                    status_updated_at = $2, confirmed_at = $2 \
              WHERE id = $1 AND status = 'pending_payment'",
        )
        .bind(booking_id)
        .bind(update.at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(UnitOutcome {
            payment_moved: true,
            booking_moved: booking.rows_affected() == 1,
        })
    }

    async fn fail(
        &self,
        payment_id: Uuid,
        update: &FailureUpdate,
    ) -> Result<UnitOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let booking_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE payments \
                SET status = 'failed', payment_ref = COALESCE($2, payment_ref), \
                    error_code = $3, error_description = $4, failed_at = $5 \
              WHERE id = $1 AND status = 'created' \
              RETURNING booking_id",
        )
        .bind(payment_id)
        .bind(update.payment_ref.as_deref())
        .bind(update.error_code.as_deref())
        .bind(update.error_description.as_deref())
        .bind(update.at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(booking_id) = booking_id else {
            tx.rollback().await?;
            return Ok(UnitOutcome {
                payment_moved: false,
                booking_moved: false,
            });
        };

        let booking = sqlx::query(
            "UPDATE bookings \
                SET status = 'payment_failed', payment_status = 'failed', status_updated_at = $2 \
              WHERE id = $1 AND status = 'pending_payment'",
        )
        .bind(booking_id)
        .bind(update.at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(UnitOutcome {
            payment_moved: true,
            booking_moved: booking.rows_affected() == 1,
        })
    }

    async fn record_refund(
        &self,
        payment_id: Uuid,
        update: &RefundUpdate,
    ) -> Result<UnitOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let booking_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE payments \
                SET refund_ref = $2, refund_amount = $3, refunded_at = $4, \
                    status = CASE WHEN $5 THEN 'refunded' ELSE status END \
              WHERE id = $1 AND status = 'captured' \
              RETURNING booking_id",
        )
        .bind(payment_id)
        .bind(update.refund_ref.as_str())
        .bind(update.amount)
        .bind(update.at)
        .bind(update.full)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(booking_id) = booking_id else {
            tx.rollback().await?;
            return Ok(UnitOutcome {
                payment_moved: false,
                booking_moved: false,
            });
        };

        let mut booking_moved = false;
        if update.full {
            // Only statuses with a refund edge move; a completed booking
            // keeps its history even when the money goes back.
            let booking = sqlx::query(
                "UPDATE bookings \
                    SET status = 'refunded', payment_status = 'refunded', status_updated_at = $2 \
                  WHERE id = $1 AND status IN ('confirmed', 'cancelled')",
            )
            .bind(booking_id)
            .bind(update.at)
            .execute(&mut *tx)
            .await?;
            booking_moved = booking.rows_affected() == 1;
        }

        tx.commit().await?;
        Ok(UnitOutcome {
            payment_moved: true,
            booking_moved,
        })
    }

    async fn captured_with_pending_booking(&self) -> Result<Vec<Payment>, StoreError> {
        let sql = format!(
            "SELECT p.{} FROM payments p \
             JOIN bookings b ON b.id = p.booking_id \
             WHERE p.status = 'captured' AND b.status = 'pending_payment'",
            PAYMENT_COLUMNS.replace(", ", ", p.")
        );
        let rows: Vec<PaymentRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(PaymentRow::into_payment).collect()
    }
}
