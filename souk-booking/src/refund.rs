use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use souk_shared::money::round_minor;

/// Time-banded cancellation refund policy. Thresholds are configurable;
/// the defaults mirror the marketplace terms of service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationPolicy {
    pub full_refund_hours: i64,
    pub half_refund_hours: i64,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            full_refund_hours: 48,
            half_refund_hours: 24,
        }
    }
}

impl CancellationPolicy {
    /// Refund owed when a booking worth `total` is cancelled at `now` for a
    /// service starting at `start_at`. Comparisons are strict: cancelling at
    /// exactly a threshold falls into the lower band.
    pub fn refund_due(&self, now: DateTime<Utc>, start_at: DateTime<Utc>, total: Decimal) -> Decimal {
        let until_start = start_at - now;
        if until_start > Duration::hours(self.full_refund_hours) {
            total
        } else if until_start > Duration::hours(self.half_refund_hours) {
            round_minor(total * Decimal::new(5, 1))
        } else {
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cancel_at(hours: i64, minutes: i64, seconds: i64) -> Decimal {
        let now = Utc::now();
        let start = now + Duration::hours(hours) + Duration::minutes(minutes) + Duration::seconds(seconds);
        CancellationPolicy::default().refund_due(now, start, dec!(300.00))
    }

    #[test]
    fn over_48_hours_refunds_in_full() {
        assert_eq!(cancel_at(48, 0, 1), dec!(300.00));
        assert_eq!(cancel_at(72, 0, 0), dec!(300.00));
    }

    #[test]
    fn between_24_and_48_hours_refunds_half() {
        assert_eq!(cancel_at(47, 59, 0), dec!(150.00));
        assert_eq!(cancel_at(30, 0, 0), dec!(150.00));
    }

    #[test]
    fn thresholds_fall_into_the_lower_band() {
        assert_eq!(cancel_at(48, 0, 0), dec!(150.00));
        assert_eq!(cancel_at(24, 0, 0), Decimal::ZERO);
    }

    #[test]
    fn under_24_hours_refunds_nothing() {
        assert_eq!(cancel_at(23, 59, 0), Decimal::ZERO);
        assert_eq!(cancel_at(1, 0, 0), Decimal::ZERO);
    }

    #[test]
    fn past_start_refunds_nothing() {
        let now = Utc::now();
        let started = now - Duration::hours(2);
        let refund = CancellationPolicy::default().refund_due(now, started, dec!(300.00));
        assert_eq!(refund, Decimal::ZERO);
    }

    #[test]
    fn half_refunds_round_to_two_decimals() {
        let now = Utc::now();
        let start = now + Duration::hours(30);
        let refund = CancellationPolicy::default().refund_due(now, start, dec!(99.99));
        assert_eq!(refund, dec!(50.00));
    }
}
