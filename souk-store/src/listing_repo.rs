use async_trait::async_trait;
use rust_decimal::Decimal;
use souk_catalog::listing::DirectoryError;
use souk_catalog::{ListingDirectory, ListingSummary, PricingModel};
use sqlx::PgPool;
use uuid::Uuid;

/// Read-side directory over the marketplace's listing and provider tables.
/// The booking engine never writes these; listing CRUD belongs to the rest
/// of the marketplace.
pub struct PgListingDirectory {
    pool: PgPool,
}

impl PgListingDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct ListingRow {
    id: Uuid,
    provider_id: Uuid,
    title: String,
    is_active: bool,
    pricing: serde_json::Value,
    deposit_amount: Decimal,
}

impl ListingRow {
    fn into_summary(self) -> Result<ListingSummary, DirectoryError> {
        let pricing: PricingModel = serde_json::from_value(self.pricing)?;
        Ok(ListingSummary {
            id: self.id,
            provider_id: self.provider_id,
            title: self.title,
            is_active: self.is_active,
            pricing,
            deposit_amount: self.deposit_amount,
        })
    }
}

#[async_trait]
impl ListingDirectory for PgListingDirectory {
    async fn active_listing(&self, id: Uuid) -> Result<Option<ListingSummary>, DirectoryError> {
        let row: Option<ListingRow> = sqlx::query_as(
            "SELECT id, provider_id, title, is_active, pricing, deposit_amount \
             FROM listings WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ListingRow::into_summary).transpose()
    }

    async fn provider_approved(&self, provider_id: Uuid) -> Result<bool, DirectoryError> {
        let approved: Option<bool> =
            sqlx::query_scalar("SELECT is_approved FROM providers WHERE id = $1")
                .bind(provider_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(approved.unwrap_or(false))
    }
}
