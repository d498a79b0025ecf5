//! Tax split of tax-inclusive totals

use serde::Serialize;

/// A tax-inclusive amount split into its tax and tax-exclusive parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxBreakdown {
    /// The tax-inclusive amount the split was derived from
    pub amount: i64,
    pub tax_amount: i64,
    pub exclusive_amount: i64,
}

impl TaxBreakdown {
    /// Split a tax-inclusive `amount` (whole yen) at a percentage `rate`
    ///
    /// `tax = round(amount × rate / (100 + rate))`, rounding half away from
    /// zero, and `exclusive = amount − tax`, so the two parts always sum back
    /// to `amount`. Callers reject negative or non-finite inputs beforehand.
    pub fn from_inclusive(amount: i64, rate: f64) -> Self {
        let tax_amount = (amount as f64 * rate / (100.0 + rate)).round() as i64;
        Self {
            amount,
            tax_amount,
            exclusive_amount: amount - tax_amount,
        }
    }
}
