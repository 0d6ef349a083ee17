use std::sync::Arc;

use souk_booking::BookingService;
use souk_payment::PaymentService;

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    pub payments: Arc<PaymentService>,
}
