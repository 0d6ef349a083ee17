pub mod lock;

/// Domain errors shared across the booking and payment crates. The API
/// layer maps these onto HTTP statuses; everything else propagates them.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Slot is being processed by another request, retry shortly")]
    SlotContended,
    #[error("Listing not found, inactive, or provider not approved")]
    ListingUnavailable,
    #[error("Invalid booking interval: {0}")]
    InvalidInterval(String),
    #[error("Requested dates are no longer available")]
    BookingConflict,
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Booking is not eligible for this operation: {0}")]
    BookingNotEligible(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Signature verification failed")]
    SignatureInvalid,
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Storage error: {0}")]
    Storage(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type CoreResult<T> = Result<T, CoreError>;
