pub mod listing;
pub mod pricing;

pub use listing::{ListingDirectory, ListingSummary, MemoryListingDirectory, PricingModel, ServicePackage};
pub use pricing::QuoteOptions;
