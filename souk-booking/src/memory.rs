use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::availability::overlaps;
use crate::models::{Booking, BookingFilter, BookingStatus};
use crate::store::{BookingChange, BookingStore, StoreError, DEFAULT_LIST_LIMIT};

/// Shared handle to the booking table. The in-memory payment store clones
/// this so capture/failure/refund can stamp the booking inside its own
/// write unit.
pub type BookingTable = Arc<RwLock<HashMap<Uuid, Booking>>>;

/// In-memory booking store for tests and single-node runs.
#[derive(Default)]
pub struct MemoryBookingStore {
    bookings: BookingTable,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> BookingTable {
        Arc::clone(&self.bookings)
    }
}

fn filtered(
    table: &HashMap<Uuid, Booking>,
    filter: &BookingFilter,
    keep: impl Fn(&Booking) -> bool,
) -> Vec<Booking> {
    let mut rows: Vec<Booking> = table
        .values()
        .filter(|booking| keep(booking))
        .filter(|booking| filter.status.map_or(true, |status| booking.status == status))
        .cloned()
        .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows.truncate(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT).max(0) as usize);
    rows
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError> {
        self.bookings
            .write()
            .await
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn count_occupying_overlaps(
        &self,
        listing_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let table = self.bookings.read().await;
        let count = table
            .values()
            .filter(|b| b.listing_id == listing_id)
            .filter(|b| b.status.occupies_slot())
            .filter(|b| overlaps(b.start_at, b.end_at, start_at, end_at))
            .count();
        Ok(count as i64)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: BookingStatus,
        change: &BookingChange,
    ) -> Result<bool, StoreError> {
        let mut table = self.bookings.write().await;
        match table.get_mut(&id) {
            Some(booking) if booking.status == from => {
                booking.apply_change(change);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_for_customer(
        &self,
        customer_id: Uuid,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError> {
        let table = self.bookings.read().await;
        Ok(filtered(&table, filter, |b| b.customer_id == customer_id))
    }

    async fn list_for_provider(
        &self,
        provider_id: Uuid,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError> {
        let table = self.bookings.read().await;
        Ok(filtered(&table, filter, |b| b.provider_id == provider_id))
    }
}
