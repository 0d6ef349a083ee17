use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use souk_booking::store::{BookingChange, BookingStore, StoreError, DEFAULT_LIST_LIMIT};
use souk_booking::{Booking, BookingFilter, BookingStatus, PaymentState};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, listing_id, customer_id, provider_id, start_at, end_at, \
     status, payment_status, total_amount, deposit_amount, package, is_emergency, \
     customer_notes, status_notes, cancellation_reason, refund_amount, \
     created_at, status_updated_at, confirmed_at, cancelled_at";

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    listing_id: Uuid,
    customer_id: Uuid,
    provider_id: Uuid,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    status: String,
    payment_status: String,
    total_amount: Decimal,
    deposit_amount: Decimal,
    package: Option<String>,
    is_emergency: bool,
    customer_notes: Option<String>,
    status_notes: Option<String>,
    cancellation_reason: Option<String>,
    refund_amount: Option<Decimal>,
    created_at: DateTime<Utc>,
    status_updated_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, StoreError> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| format!("unknown booking status '{}'", self.status))?;
        let payment_status = PaymentState::parse(&self.payment_status)
            .ok_or_else(|| format!("unknown payment state '{}'", self.payment_status))?;
        Ok(Booking {
            id: self.id,
            listing_id: self.listing_id,
            customer_id: self.customer_id,
            provider_id: self.provider_id,
            start_at: self.start_at,
            end_at: self.end_at,
            status,
            payment_status,
            total_amount: self.total_amount,
            deposit_amount: self.deposit_amount,
            package: self.package,
            is_emergency: self.is_emergency,
            customer_notes: self.customer_notes,
            status_notes: self.status_notes,
            cancellation_reason: self.cancellation_reason,
            refund_amount: self.refund_amount,
            created_at: self.created_at,
            status_updated_at: self.status_updated_at,
            confirmed_at: self.confirmed_at,
            cancelled_at: self.cancelled_at,
        })
    }
}

fn occupying_statuses() -> Vec<String> {
    BookingStatus::ALL
        .iter()
        .filter(|s| s.occupies_slot())
        .map(|s| s.as_str().to_string())
        .collect()
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)"
        );
        sqlx::query(&sql)
            .bind(booking.id)
            .bind(booking.listing_id)
            .bind(booking.customer_id)
            .bind(booking.provider_id)
            .bind(booking.start_at)
            .bind(booking.end_at)
            .bind(booking.status.as_str())
            .bind(booking.payment_status.as_str())
            .bind(booking.total_amount)
            .bind(booking.deposit_amount)
            .bind(booking.package.as_deref())
            .bind(booking.is_emergency)
            .bind(booking.customer_notes.as_deref())
            .bind(booking.status_notes.as_deref())
            .bind(booking.cancellation_reason.as_deref())
            .bind(booking.refund_amount)
            .bind(booking.created_at)
            .bind(booking.status_updated_at)
            .bind(booking.confirmed_at)
            .bind(booking.cancelled_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn count_occupying_overlaps(
        &self,
        listing_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        // Half-open overlap: the proposal starts before an existing booking
        // ends and ends after it starts.
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings \
             WHERE listing_id = $1 AND status = ANY($2) AND start_at < $3 AND end_at > $4",
        )
        .bind(listing_id)
        .bind(occupying_statuses())
        .bind(end_at)
        .bind(start_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: BookingStatus,
        change: &BookingChange,
    ) -> Result<bool, StoreError> {
        // The status guard in the WHERE clause is the compare-and-set: a
        // concurrent writer that moved the booking first makes this a no-op.
        let result = sqlx::query(
            "UPDATE bookings \
                SET status = $1, \
                    payment_status = COALESCE($2, payment_status), \
                    status_notes = COALESCE($3, status_notes), \
                    cancellation_reason = COALESCE($4, cancellation_reason), \
                    refund_amount = COALESCE($5, refund_amount), \
                    status_updated_at = $6, \
                    confirmed_at = CASE WHEN $1 = 'confirmed' THEN $6 ELSE confirmed_at END, \
                    cancelled_at = CASE WHEN $1 = 'cancelled' THEN $6 ELSE cancelled_at END \
              WHERE id = $7 AND status = $8",
        )
        .bind(change.to.as_str())
        .bind(change.payment_status.map(|s| s.as_str()))
        .bind(change.status_notes.as_deref())
        .bind(change.cancellation_reason.as_deref())
        .bind(change.refund_amount)
        .bind(change.at)
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_for_customer(
        &self,
        customer_id: Uuid,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError> {
        self.list("customer_id", customer_id, filter).await
    }

    async fn list_for_provider(
        &self,
        provider_id: Uuid,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError> {
        self.list("provider_id", provider_id, filter).await
    }
}

impl PgBookingStore {
    async fn list(
        &self,
        party_column: &str,
        party_id: Uuid,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError> {
        let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 500);
        let rows: Vec<BookingRow> = if let Some(status) = filter.status {
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings \
                 WHERE {party_column} = $1 AND status = $2 \
                 ORDER BY created_at DESC LIMIT $3"
            );
            sqlx::query_as(&sql)
                .bind(party_id)
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings \
                 WHERE {party_column} = $1 \
                 ORDER BY created_at DESC LIMIT $2"
            );
            sqlx::query_as(&sql)
                .bind(party_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        };
        rows.into_iter().map(BookingRow::into_booking).collect()
    }
}
