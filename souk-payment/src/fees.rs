use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use souk_shared::money::round_minor;

/// Commission rates applied to every captured payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeRates {
    pub platform: Decimal,
    pub gateway: Decimal,
}

impl Default for FeeRates {
    fn default() -> Self {
        Self {
            platform: Decimal::new(3, 2),
            gateway: Decimal::new(2, 2),
        }
    }
}

/// How a payment amount splits between fees and the provider payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub amount: Decimal,
    pub platform_fee: Decimal,
    pub gateway_fee: Decimal,
    pub payout_amount: Decimal,
}

impl FeeBreakdown {
    /// Each fee rounds to two decimals on its own; the payout is the exact
    /// remainder, so the three parts always sum back to the amount.
    pub fn compute(amount: Decimal, rates: &FeeRates) -> Self {
        let platform_fee = round_minor(amount * rates.platform);
        let gateway_fee = round_minor(amount * rates.gateway);
        let payout_amount = round_minor(amount - platform_fee - gateway_fee);
        Self {
            amount,
            platform_fee,
            gateway_fee,
            payout_amount,
        }
    }
}
