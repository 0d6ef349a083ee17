use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

pub type DirectoryError = Box<dyn std::error::Error + Send + Sync>;

/// A named fixed-price bundle a provider offers (e.g. "deep_clean").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServicePackage {
    pub name: String,
    pub price: Decimal,
}

/// How a listing prices itself. Several fields may be set at once; quoting
/// resolves them in a fixed priority order (see `pricing`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingModel {
    pub hourly_rate: Option<Decimal>,
    pub daily_rate: Option<Decimal>,
    pub fixed_price: Option<Decimal>,
    #[serde(default)]
    pub packages: Vec<ServicePackage>,
    pub emergency_surcharge: Option<Decimal>,
}

/// The slice of a listing the booking flow reads. The full listing
/// aggregate (photos, descriptions, search fields) lives elsewhere in the
/// marketplace; this engine only validates and prices against these facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSummary {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub title: String,
    pub is_active: bool,
    pub pricing: PricingModel,
    /// Deposit the provider asks for up front, snapshotted onto bookings
    /// that request one.
    pub deposit_amount: Decimal,
}

/// Read-side directory of listings and provider standing.
#[async_trait]
pub trait ListingDirectory: Send + Sync {
    /// Fetch a listing if it exists and is currently active.
    async fn active_listing(&self, id: Uuid) -> Result<Option<ListingSummary>, DirectoryError>;

    /// Whether the provider has been approved to take bookings.
    async fn provider_approved(&self, provider_id: Uuid) -> Result<bool, DirectoryError>;
}

/// In-memory directory for tests and seeded single-node runs.
#[derive(Default)]
pub struct MemoryListingDirectory {
    listings: RwLock<HashMap<Uuid, ListingSummary>>,
    approved: RwLock<HashMap<Uuid, bool>>,
}

impl MemoryListingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_listing(&self, listing: ListingSummary) {
        self.listings.write().await.insert(listing.id, listing);
    }

    pub async fn set_provider_approved(&self, provider_id: Uuid, approved: bool) {
        self.approved.write().await.insert(provider_id, approved);
    }
}

#[async_trait]
impl ListingDirectory for MemoryListingDirectory {
    async fn active_listing(&self, id: Uuid) -> Result<Option<ListingSummary>, DirectoryError> {
        Ok(self
            .listings
            .read()
            .await
            .get(&id)
            .filter(|listing| listing.is_active)
            .cloned())
    }

    async fn provider_approved(&self, provider_id: Uuid) -> Result<bool, DirectoryError> {
        Ok(self
            .approved
            .read()
            .await
            .get(&provider_id)
            .copied()
            .unwrap_or(false))
    }
}
