pub mod fees;
pub mod gateway;
pub mod memory;
pub mod models;
pub mod service;
pub mod signature;
pub mod store;
pub mod webhook;

pub use fees::{FeeBreakdown, FeeRates};
pub use gateway::{GatewayPaymentDetails, MockGateway, PaymentGateway};
pub use memory::MemoryPaymentStore;
pub use models::{Payment, PaymentStatus};
pub use service::{
    CaptureCallback, FailureNotice, PaymentConfig, PaymentOrder, PaymentService, RefundOutcome,
    WebhookDisposition,
};
pub use store::{CaptureUpdate, FailureUpdate, PaymentStore, RefundUpdate, UnitOutcome};
