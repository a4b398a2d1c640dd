use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::currency_symbol;
use crate::models::{Document, DocumentDraft, DocumentKind, DocumentStatus, LineItem};
use crate::services::{DocumentsByKind, SaveStatus, SavedDocument};
use crate::totals::Totals;

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: Document,
    pub currency_symbol: String,
    pub line_items: Vec<LineItem>,
}

impl From<SavedDocument> for DocumentResponse {
    fn from(saved: SavedDocument) -> Self {
        Self {
            currency_symbol: currency_symbol(&saved.document.currency),
            document: saved.document,
            line_items: saved.line_items,
        }
    }
}

/// One row of the document list.
#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub document_number: String,
    pub kind: DocumentKind,
    pub issue_date: NaiveDate,
    pub client_name: String,
    pub total: Decimal,
    pub status: DocumentStatus,
    pub currency: String,
    pub currency_symbol: String,
    pub created_utc: DateTime<Utc>,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            currency_symbol: currency_symbol(&doc.currency),
            document_number: doc.document_number,
            kind: doc.kind,
            issue_date: doc.issue_date,
            client_name: doc.client.name,
            total: doc.total,
            status: doc.status,
            currency: doc.currency,
            created_utc: doc.created_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub invoices: Vec<DocumentSummary>,
    pub quotes: Vec<DocumentSummary>,
    pub proformas: Vec<DocumentSummary>,
}

impl From<DocumentsByKind> for DocumentListResponse {
    fn from(lists: DocumentsByKind) -> Self {
        Self {
            invoices: lists.invoices.into_iter().map(Into::into).collect(),
            quotes: lists.quotes.into_iter().map(Into::into).collect(),
            proformas: lists.proformas.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct KindQuery {
    #[serde(default = "default_kind")]
    pub kind: DocumentKind,
}

fn default_kind() -> DocumentKind {
    DocumentKind::Invoice
}

#[derive(Debug, Serialize)]
pub struct NumberPreviewResponse {
    pub kind: DocumentKind,
    pub document_number: String,
}

/// Form state plus the totals it currently adds up to.
#[derive(Debug, Serialize)]
pub struct DraftResponse {
    #[serde(flatten)]
    pub draft: DocumentDraft,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub currency_symbol: String,
}

impl From<DocumentDraft> for DraftResponse {
    fn from(draft: DocumentDraft) -> Self {
        let Totals {
            subtotal,
            tax_amount,
            total,
        } = draft.totals();
        Self {
            currency_symbol: currency_symbol(&draft.currency),
            draft,
            subtotal,
            tax_amount,
            total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveStatusResponse {
    pub document_id: Uuid,
    pub session_open: bool,
    pub status: SaveStatus,
}
