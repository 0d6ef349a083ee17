pub mod availability;
pub mod lifecycle;
pub mod memory;
pub mod models;
pub mod refund;
pub mod service;
pub mod store;

pub use memory::MemoryBookingStore;
pub use models::{Booking, BookingFilter, BookingRequest, BookingStatus, PaymentState};
pub use refund::CancellationPolicy;
pub use service::BookingService;
pub use store::{BookingChange, BookingStore};
