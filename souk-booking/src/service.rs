use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use souk_catalog::{ListingDirectory, QuoteOptions};
use souk_core::lock::{slot_key, SlotLock};
use souk_core::{CoreError, CoreResult};
use tracing::{info, warn};
use uuid::Uuid;

use crate::availability::validate_interval;
use crate::models::{Booking, BookingFilter, BookingRequest, BookingStatus};
use crate::refund::CancellationPolicy;
use crate::store::{BookingChange, BookingStore};

/// Orchestrates booking creation and lifecycle updates: slot lease,
/// listing and interval validation, availability, quoting, and the
/// store-guarded status changes afterwards.
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    listings: Arc<dyn ListingDirectory>,
    lock: Arc<dyn SlotLock>,
    policy: CancellationPolicy,
    lock_ttl: Duration,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        listings: Arc<dyn ListingDirectory>,
        lock: Arc<dyn SlotLock>,
        policy: CancellationPolicy,
        lock_ttl: Duration,
    ) -> Self {
        Self {
            store,
            listings,
            lock,
            policy,
            lock_ttl,
        }
    }

    /// Creates a booking for `customer_id`. The slot lease serializes
    /// concurrent requests for the same listing and start instant; the
    /// availability count against the store decides who wins. The lease is
    /// always released on the way out, success or not, with the TTL as the
    /// backstop if the release itself fails.
    pub async fn create_booking(
        &self,
        customer_id: Uuid,
        req: &BookingRequest,
    ) -> CoreResult<Booking> {
        let key = slot_key(req.listing_id, req.start_at);
        let token = self
            .lock
            .acquire(&key, self.lock_ttl)
            .await?
            .ok_or(CoreError::SlotContended)?;

        let result = self.create_under_lease(customer_id, req).await;

        if let Err(err) = self.lock.release(&key, &token).await {
            warn!(key = %key, error = %err, "slot lease release failed, ttl will reap it");
        }
        result
    }

    async fn create_under_lease(
        &self,
        customer_id: Uuid,
        req: &BookingRequest,
    ) -> CoreResult<Booking> {
        let listing = self
            .listings
            .active_listing(req.listing_id)
            .await?
            .ok_or(CoreError::ListingUnavailable)?;
        if !self.listings.provider_approved(listing.provider_id).await? {
            return Err(CoreError::ListingUnavailable);
        }

        validate_interval(Utc::now(), req.start_at, req.end_at)?;

        let conflicts = self
            .store
            .count_occupying_overlaps(req.listing_id, req.start_at, req.end_at)
            .await?;
        if conflicts > 0 {
            return Err(CoreError::BookingConflict);
        }

        let opts = QuoteOptions {
            package: req.package.clone(),
            is_emergency: req.is_emergency,
        };
        let total = listing.pricing.quote(req.start_at, req.end_at, &opts);
        let deposit = if req.deposit_required {
            listing.deposit_amount
        } else {
            Decimal::ZERO
        };

        let booking = Booking::new(customer_id, &listing, req, total, deposit);
        self.store.insert(&booking).await?;
        info!(
            booking_id = %booking.id,
            listing_id = %req.listing_id,
            total = %total,
            "booking created"
        );
        Ok(booking)
    }

    /// Fetches a booking. When `accessor` is given, only parties to the
    /// booking can see it; everyone else gets not-found rather than a hint
    /// that the id exists.
    pub async fn get_booking(&self, id: Uuid, accessor: Option<Uuid>) -> CoreResult<Booking> {
        let booking = self
            .store
            .get(id)
            .await?
            .ok_or(CoreError::NotFound("booking"))?;
        if let Some(user) = accessor {
            if booking.customer_id != user && booking.provider_id != user {
                return Err(CoreError::NotFound("booking"));
            }
        }
        Ok(booking)
    }

    pub async fn for_customer(
        &self,
        customer_id: Uuid,
        filter: &BookingFilter,
    ) -> CoreResult<Vec<Booking>> {
        Ok(self.store.list_for_customer(customer_id, filter).await?)
    }

    pub async fn for_provider(
        &self,
        provider_id: Uuid,
        filter: &BookingFilter,
    ) -> CoreResult<Vec<Booking>> {
        Ok(self.store.list_for_provider(provider_id, filter).await?)
    }

    /// Read-side availability probe for calendars. Advisory only: the
    /// answer can go stale the moment it is returned, and `create_booking`
    /// re-checks under the slot lease anyway.
    pub async fn check_availability(
        &self,
        listing_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> CoreResult<bool> {
        validate_interval(Utc::now(), start_at, end_at)?;
        let conflicts = self
            .store
            .count_occupying_overlaps(listing_id, start_at, end_at)
            .await?;
        Ok(conflicts == 0)
    }

    /// Applies a user-requested status change (provider starting or
    /// finishing the job, customer marking it reviewed). Payment-driven
    /// edges are rejected here regardless of what the store would accept.
    pub async fn update_status(
        &self,
        id: Uuid,
        accessor: Uuid,
        to: BookingStatus,
        notes: Option<String>,
    ) -> CoreResult<Booking> {
        let booking = self.get_booking(id, Some(accessor)).await?;
        let from = booking.status;
        if !from.user_transition_allowed(to) {
            return Err(CoreError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let mut change = BookingChange::new(to, Utc::now());
        change.status_notes = notes;
        if !self.store.transition(id, from, &change).await? {
            // Lost a race with another writer; the precondition is gone.
            return Err(CoreError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        info!(booking_id = %id, from = %from, to = %to, "booking status updated");
        let mut updated = booking;
        updated.apply_change(&change);
        Ok(updated)
    }

    /// Cancels a booking and stamps the refund the policy owes. Only the
    /// entitlement is recorded here; moving the money is the payment
    /// orchestrator's job.
    pub async fn cancel_booking(
        &self,
        id: Uuid,
        accessor: Uuid,
        reason: Option<String>,
    ) -> CoreResult<Booking> {
        let booking = self.get_booking(id, Some(accessor)).await?;
        let from = booking.status;
        if !from.is_cancellable() {
            return Err(CoreError::InvalidTransition {
                from: from.to_string(),
                to: BookingStatus::Cancelled.to_string(),
            });
        }

        let refund = self
            .policy
            .refund_due(Utc::now(), booking.start_at, booking.total_amount);
        let mut change = BookingChange::new(BookingStatus::Cancelled, Utc::now());
        change.cancellation_reason = reason;
        change.refund_amount = Some(refund);
        if !self.store.transition(id, from, &change).await? {
            return Err(CoreError::InvalidTransition {
                from: from.to_string(),
                to: BookingStatus::Cancelled.to_string(),
            });
        }

        info!(booking_id = %id, refund = %refund, "booking cancelled");
        let mut updated = booking;
        updated.apply_change(&change);
        Ok(updated)
    }
}
