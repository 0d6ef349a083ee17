use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use souk_shared::money::{floor_zero, round_minor};

use crate::listing::PricingModel;

const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;

/// Caller-selected options that steer a quote.
#[derive(Debug, Clone, Default)]
pub struct QuoteOptions {
    /// Package name, matched exactly against the listing's packages.
    pub package: Option<String>,
    pub is_emergency: bool,
}

/// Billable whole hours for an interval, any partial hour rounded up.
pub fn billable_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let secs = (end - start).num_seconds().max(0);
    (secs + SECS_PER_HOUR - 1) / SECS_PER_HOUR
}

/// Billable whole days for an interval, any partial day rounded up.
pub fn billable_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let secs = (end - start).num_seconds().max(0);
    (secs + SECS_PER_DAY - 1) / SECS_PER_DAY
}

impl PricingModel {
    /// Quotes the interval under this model. Exactly one base rule applies,
    /// in priority order: hourly for sub-day intervals, daily for intervals
    /// of a day or more, then fixed price, then a named package (an unknown
    /// package name quotes zero). The emergency surcharge is added after the
    /// base rule. The result is clamped at zero and rounded to two decimals.
    pub fn quote(&self, start: DateTime<Utc>, end: DateTime<Utc>, opts: &QuoteOptions) -> Decimal {
        let sub_day = (end - start).num_seconds() < SECS_PER_DAY;

        let mut amount = if let (true, Some(rate)) = (sub_day, self.hourly_rate) {
            rate * Decimal::from(billable_hours(start, end))
        } else if let (false, Some(rate)) = (sub_day, self.daily_rate) {
            rate * Decimal::from(billable_days(start, end))
        } else if let Some(fixed) = self.fixed_price {
            fixed
        } else if let Some(wanted) = opts.package.as_deref() {
            self.packages
                .iter()
                .find(|p| p.name == wanted)
                .map(|p| p.price)
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        if opts.is_emergency {
            if let Some(surcharge) = self.emergency_surcharge {
                amount += surcharge;
            }
        }

        round_minor(floor_zero(amount))
    }
}
