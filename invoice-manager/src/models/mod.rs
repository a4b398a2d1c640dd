//! Domain models for invoice-manager.

mod client;
mod document;
mod draft;
mod line_item;
pub(crate) mod settings;

pub use client::{Client, NewClient};
pub use document::{ClientSnapshot, Document, DocumentFields, DocumentKind, DocumentStatus};
pub use draft::{DocumentDraft, DraftError};
pub use line_item::{LineItem, LineItemInput, LineItemPatch, NewLineItem, DEFAULT_UNIT};
pub use settings::{CompanySettings, SettingsUpdate, DEFAULT_UNITS};

/// Trim a text field, mapping blank input to `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
