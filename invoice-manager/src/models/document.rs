//! Document model: invoices, quotes and proforma invoices.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Kind of document, each with its own number sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    Quote,
    Proforma,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Invoice,
        DocumentKind::Quote,
        DocumentKind::Proforma,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::Quote => "quote",
            DocumentKind::Proforma => "proforma",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "quote" => DocumentKind::Quote,
            "proforma" => DocumentKind::Proforma,
            _ => DocumentKind::Invoice,
        }
    }

    /// Prefix used in generated document numbers.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "INV",
            DocumentKind::Quote => "EQ",
            DocumentKind::Proforma => "PI",
        }
    }

    /// Heading printed at the top of the document.
    pub fn heading(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "INVOICE",
            DocumentKind::Quote => "QUOTE",
            DocumentKind::Proforma => "PROFORMA INVOICE",
        }
    }

    /// Prefix of the exported file title.
    pub fn title_prefix(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "Invoice",
            DocumentKind::Quote => "Quote",
            DocumentKind::Proforma => "Proforma-Invoice",
        }
    }
}

/// Document status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Sent => "sent",
            DocumentStatus::Paid => "paid",
            DocumentStatus::Overdue => "overdue",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "sent" => DocumentStatus::Sent,
            "paid" => DocumentStatus::Paid,
            "overdue" => DocumentStatus::Overdue,
            _ => DocumentStatus::Draft,
        }
    }
}

/// Client details copied onto a document when a client is selected.
///
/// This is a snapshot, not a reference: later edits to the address book do
/// not reach documents that were already filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ClientSnapshot {
    #[validate(length(min = 1, message = "Client name is required"))]
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub tax_number: Option<String>,
    pub pan_number: Option<String>,
}

/// A persisted document header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub document_number: String,
    pub kind: DocumentKind,
    pub status: DocumentStatus,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub client: ClientSnapshot,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_enabled: bool,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Every writable column of a document.
///
/// Inserts and updates both write the full set; totals must come from
/// [`crate::totals::Totals`] and never from caller input.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFields {
    pub document_number: String,
    pub kind: DocumentKind,
    pub status: DocumentStatus,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub client: ClientSnapshot,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_enabled: bool,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
}

impl Document {
    /// Build a document from its id, timestamps and written fields.
    pub fn from_fields(
        id: Uuid,
        fields: &DocumentFields,
        created_utc: DateTime<Utc>,
        updated_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            document_number: fields.document_number.clone(),
            kind: fields.kind,
            status: fields.status,
            issue_date: fields.issue_date,
            due_date: fields.due_date,
            client: fields.client.clone(),
            currency: fields.currency.clone(),
            subtotal: fields.subtotal,
            tax_enabled: fields.tax_enabled,
            tax_rate: fields.tax_rate,
            tax_amount: fields.tax_amount,
            total: fields.total,
            payment_terms: fields.payment_terms.clone(),
            notes: fields.notes.clone(),
            created_utc,
            updated_utc,
        }
    }
}
