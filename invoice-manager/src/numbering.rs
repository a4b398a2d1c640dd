//! Sequential document numbers.

use chrono::NaiveDate;

use crate::models::DocumentKind;

/// Number a document as `PREFIX + counter (4 digits, zero padded) + YYMMDD`.
///
/// Counters past 9999 widen the number rather than being cut.
pub fn document_number(kind: DocumentKind, counter: u32, date: NaiveDate) -> String {
    format!(
        "{}{:04}{}",
        kind.number_prefix(),
        counter,
        date.format("%y%m%d")
    )
}
