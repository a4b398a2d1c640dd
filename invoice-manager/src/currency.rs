//! Currency symbols and amount formatting for rendered documents.

use rust_decimal::Decimal;

use crate::totals::round_money;

/// Display symbol for an ISO currency code.
///
/// Unknown codes render as the code followed by a space.
pub fn currency_symbol(code: &str) -> String {
    let symbol = match code.to_ascii_uppercase().as_str() {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "INR" => "₹",
        "JPY" | "CNY" => "¥",
        "AUD" => "A$",
        "CAD" => "C$",
        "SGD" => "S$",
        "NZD" => "NZ$",
        "ZAR" => "R",
        "CHF" => "CHF ",
        "AED" => "AED ",
        other => return format!("{} ", other),
    };
    symbol.to_string()
}

/// Fixed two-decimal money value without a symbol.
pub fn format_amount(value: Decimal) -> String {
    format!("{:.2}", round_money(value))
}

/// Symbol followed by the fixed two-decimal amount.
pub fn format_money(code: &str, value: Decimal) -> String {
    format!("{}{}", currency_symbol(code), format_amount(value))
}

/// Quantity with trailing zeros dropped, so `2.50` shows as `2.5`.
pub fn format_quantity(value: Decimal) -> String {
    value.normalize().to_string()
}
