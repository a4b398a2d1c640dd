//! Subtotal, tax and total arithmetic.
//!
//! All amounts are rounded to two decimal places, half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::models::LineItemInput;

/// Decimal places kept for quantities and rates.
pub const UNIT_SCALE: u32 = 4;
/// Decimal places kept for money and tax percentages.
pub const MONEY_SCALE: u32 = 2;

pub(crate) fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a quantity or rate to the precision the store keeps.
pub(crate) fn round_unit(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Amount of a single line.
pub fn line_amount(quantity: Decimal, rate: Decimal) -> Decimal {
    round_money(quantity * rate)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl Totals {
    /// Derive totals from line items; stored line amounts are ignored.
    pub fn compute(items: &[LineItemInput], tax_enabled: bool, tax_rate: Decimal) -> Self {
        let subtotal = items
            .iter()
            .map(|item| line_amount(item.quantity, item.rate))
            .sum::<Decimal>();

        let tax_amount = if tax_enabled {
            round_money(subtotal * tax_rate / Decimal::ONE_HUNDRED)
        } else {
            Decimal::ZERO
        };

        Self {
            subtotal,
            tax_amount,
            total: subtotal + tax_amount,
        }
    }
}
