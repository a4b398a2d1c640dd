//! In-memory form state for a document being created or edited.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::{
    non_empty, Client, ClientSnapshot, CompanySettings, Document, DocumentFields, DocumentKind,
    DocumentStatus, LineItem, LineItemInput, LineItemPatch, NewLineItem,
};
use crate::numbering::document_number;
use crate::totals::{line_amount, round_money, round_unit, Totals};

/// Rejected edits to a draft's line items.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("A document must keep at least one line item")]
    LastLineItem,

    #[error("Line item {0} does not exist")]
    LineItemOutOfRange(usize),
}

/// Everything the document form edits, with totals derived on demand.
///
/// `id` is `None` until the first save. The same shape is the request body
/// for create, update and auto-save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DocumentDraft {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub kind: DocumentKind,
    #[serde(default)]
    pub document_number: String,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: DocumentStatus,
    #[validate(nested)]
    pub client: ClientSnapshot,
    pub currency: String,
    pub tax_enabled: bool,
    #[validate(custom(function = "crate::models::settings::validate_tax_rate"))]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub line_items: Vec<LineItemInput>,
}

impl DocumentDraft {
    /// A blank form for a new document, defaults taken from the settings.
    pub fn new_for(settings: &CompanySettings, kind: DocumentKind, today: NaiveDate) -> Self {
        Self {
            id: None,
            kind,
            document_number: document_number(kind, settings.counter_for(kind), today),
            issue_date: today,
            due_date: None,
            status: DocumentStatus::Draft,
            client: ClientSnapshot::default(),
            currency: settings.currency.clone(),
            tax_enabled: settings.tax_enabled,
            tax_rate: settings.tax_rate,
            payment_terms: settings.default_payment_terms.clone(),
            notes: None,
            line_items: vec![LineItemInput::default()],
        }
    }

    /// Rebuild the form from a saved document.
    ///
    /// A document stored without lines gets one blank line back.
    pub fn from_saved(document: &Document, items: &[LineItem]) -> Self {
        let mut line_items: Vec<LineItemInput> = items.iter().map(LineItemInput::from).collect();
        if line_items.is_empty() {
            line_items.push(LineItemInput::default());
        }
        let mut draft = Self {
            id: Some(document.id),
            kind: document.kind,
            document_number: document.document_number.clone(),
            issue_date: document.issue_date,
            due_date: document.due_date,
            status: document.status,
            client: document.client.clone(),
            currency: document.currency.clone(),
            tax_enabled: document.tax_enabled,
            tax_rate: document.tax_rate,
            payment_terms: document.payment_terms.clone(),
            notes: document.notes.clone(),
            line_items,
        };
        draft.recompute();
        draft
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Switch the document kind.
    ///
    /// New documents get a freshly previewed number from that kind's counter;
    /// saved documents keep the number they were issued with.
    pub fn change_kind(&mut self, kind: DocumentKind, settings: &CompanySettings, today: NaiveDate) {
        self.kind = kind;
        if self.is_new() {
            self.document_number = document_number(kind, settings.counter_for(kind), today);
        }
    }

    /// Copy a client's details onto the document.
    pub fn select_client(&mut self, client: &Client) {
        self.client = ClientSnapshot {
            name: client.name.clone(),
            email: client.email.clone(),
            address: client.address.clone(),
            tax_number: client.tax_number.clone(),
            pan_number: client.pan_number.clone(),
        };
    }

    pub fn add_line_item(&mut self) {
        self.line_items.push(LineItemInput::default());
    }

    /// Remove the line at `index`, refusing to remove the last one.
    pub fn remove_line_item(&mut self, index: usize) -> Result<LineItemInput, DraftError> {
        if index >= self.line_items.len() {
            return Err(DraftError::LineItemOutOfRange(index));
        }
        if self.line_items.len() == 1 {
            return Err(DraftError::LastLineItem);
        }
        Ok(self.line_items.remove(index))
    }

    pub fn update_line_item(&mut self, index: usize, patch: LineItemPatch) -> Result<(), DraftError> {
        let item = self
            .line_items
            .get_mut(index)
            .ok_or(DraftError::LineItemOutOfRange(index))?;

        if let Some(description) = patch.description {
            item.description = description;
        }
        if let Some(unit) = patch.unit {
            item.unit = unit;
        }
        if let Some(quantity) = patch.quantity {
            item.quantity = quantity;
        }
        if let Some(rate) = patch.rate {
            item.rate = rate;
        }
        item.amount = line_amount(item.quantity, item.rate);
        Ok(())
    }

    pub fn set_tax(&mut self, enabled: bool, rate: Decimal) {
        self.tax_enabled = enabled;
        self.tax_rate = rate;
    }

    /// Overwrite every line amount with `quantity * rate`.
    pub fn recompute(&mut self) {
        for item in &mut self.line_items {
            item.amount = line_amount(item.quantity, item.rate);
        }
    }

    pub fn totals(&self) -> Totals {
        Totals::compute(&self.line_items, self.tax_enabled, self.tax_rate)
    }

    /// Trim text input, drop blank optionals, and round quantities, rates
    /// and the tax rate to the precision they are stored with.
    pub fn normalized(mut self) -> Self {
        self.client.name = self.client.name.trim().to_string();
        self.client.email = non_empty(self.client.email);
        self.client.address = non_empty(self.client.address);
        self.client.tax_number = non_empty(self.client.tax_number);
        self.client.pan_number = non_empty(self.client.pan_number);
        self.currency = self.currency.trim().to_uppercase();
        self.payment_terms = non_empty(self.payment_terms);
        self.notes = non_empty(self.notes);
        self.tax_rate = round_money(self.tax_rate);
        for item in &mut self.line_items {
            item.quantity = round_unit(item.quantity);
            item.rate = round_unit(item.rate);
        }
        self.recompute();
        self
    }

    /// Header columns with freshly computed totals.
    pub fn to_fields(&self) -> DocumentFields {
        let totals = self.totals();
        DocumentFields {
            document_number: self.document_number.clone(),
            kind: self.kind,
            status: self.status,
            issue_date: self.issue_date,
            due_date: self.due_date,
            client: self.client.clone(),
            currency: self.currency.clone(),
            subtotal: totals.subtotal,
            tax_enabled: self.tax_enabled,
            tax_rate: self.tax_rate,
            tax_amount: totals.tax_amount,
            total: totals.total,
            payment_terms: self.payment_terms.clone(),
            notes: self.notes.clone(),
        }
    }

    /// Lines to insert, in form order.
    pub fn to_new_line_items(&self) -> Vec<NewLineItem> {
        self.line_items
            .iter()
            .enumerate()
            .map(|(index, item)| NewLineItem {
                description: item.description.clone(),
                unit: item.unit.clone(),
                quantity: item.quantity,
                rate: item.rate,
                amount: line_amount(item.quantity, item.rate),
                sort_order: index as i32,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn settings() -> CompanySettings {
        let mut s = CompanySettings::with_defaults(Uuid::new_v4(), Utc::now());
        s.next_invoice_number = 7;
        s.next_quotation_number = 2;
        s.next_proforma_number = 30;
        s
    }

    fn line(description: &str, quantity: &str, rate: &str) -> LineItemInput {
        LineItemInput {
            description: description.to_string(),
            quantity: d(quantity),
            rate: d(rate),
            ..LineItemInput::default()
        }
    }

    #[test]
    fn new_draft_takes_defaults_from_settings() {
        let draft = DocumentDraft::new_for(&settings(), DocumentKind::Invoice, today());
        assert!(draft.is_new());
        assert_eq!(draft.document_number, "INV0007250601");
        assert_eq!(draft.currency, "USD");
        assert!(draft.tax_enabled);
        assert_eq!(draft.tax_rate, Decimal::TEN);
        assert_eq!(draft.payment_terms.as_deref(), Some("Due within 30 days"));
        assert_eq!(draft.line_items, vec![LineItemInput::default()]);
    }

    #[test]
    fn changing_kind_of_new_draft_previews_that_kinds_number() {
        let s = settings();
        let mut draft = DocumentDraft::new_for(&s, DocumentKind::Invoice, today());
        draft.change_kind(DocumentKind::Quote, &s, today());
        assert_eq!(draft.document_number, "EQ0002250601");
        draft.change_kind(DocumentKind::Proforma, &s, today());
        assert_eq!(draft.document_number, "PI0030250601");
    }

    #[test]
    fn changing_kind_of_saved_draft_keeps_its_number() {
        let s = settings();
        let mut draft = DocumentDraft::new_for(&s, DocumentKind::Invoice, today());
        draft.id = Some(Uuid::new_v4());
        draft.change_kind(DocumentKind::Quote, &s, today());
        assert_eq!(draft.kind, DocumentKind::Quote);
        assert_eq!(draft.document_number, "INV0007250601");
    }

    #[test]
    fn removing_the_only_line_is_rejected() {
        let mut draft = DocumentDraft::new_for(&settings(), DocumentKind::Invoice, today());
        assert_eq!(draft.remove_line_item(0), Err(DraftError::LastLineItem));
        assert_eq!(draft.line_items.len(), 1);
    }

    #[test]
    fn removing_a_middle_line_preserves_order() {
        let mut draft = DocumentDraft::new_for(&settings(), DocumentKind::Invoice, today());
        draft.line_items = vec![line("a", "1", "1"), line("b", "1", "2"), line("c", "1", "3")];

        let removed = draft.remove_line_item(1).unwrap();

        assert_eq!(removed.description, "b");
        let names: Vec<&str> = draft
            .line_items
            .iter()
            .map(|i| i.description.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn removing_out_of_range_line_is_an_error() {
        let mut draft = DocumentDraft::new_for(&settings(), DocumentKind::Invoice, today());
        draft.add_line_item();
        assert_eq!(
            draft.remove_line_item(5),
            Err(DraftError::LineItemOutOfRange(5))
        );
    }

    #[test]
    fn updating_quantity_or_rate_recomputes_amount() {
        let mut draft = DocumentDraft::new_for(&settings(), DocumentKind::Invoice, today());
        draft
            .update_line_item(
                0,
                LineItemPatch {
                    rate: Some(d("19.99")),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(draft.line_items[0].amount, d("19.99"));

        draft
            .update_line_item(
                0,
                LineItemPatch {
                    quantity: Some(d("3")),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(draft.line_items[0].amount, d("59.97"));
    }

    #[test]
    fn stale_amounts_are_never_trusted() {
        let mut draft = DocumentDraft::new_for(&settings(), DocumentKind::Invoice, today());
        draft.line_items = vec![LineItemInput {
            amount: d("1000"),
            ..line("stale", "2", "5")
        }];
        draft.set_tax(false, Decimal::ZERO);

        let fields = draft.to_fields();
        assert_eq!(fields.subtotal, d("10"));
        assert_eq!(fields.total, d("10"));
        assert_eq!(draft.to_new_line_items()[0].amount, d("10"));
    }

    #[test]
    fn selecting_a_client_copies_the_snapshot() {
        let mut draft = DocumentDraft::new_for(&settings(), DocumentKind::Invoice, today());
        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            name: "Globex".to_string(),
            email: Some("ap@globex.test".to_string()),
            phone: Some("555".to_string()),
            address: Some("1 Main St".to_string()),
            tax_number: Some("GST-1".to_string()),
            pan_number: None,
            created_utc: now,
            updated_utc: now,
        };

        draft.select_client(&client);

        assert_eq!(draft.client.name, "Globex");
        assert_eq!(draft.client.email.as_deref(), Some("ap@globex.test"));
        assert_eq!(draft.client.tax_number.as_deref(), Some("GST-1"));
    }

    #[test]
    fn new_line_items_are_numbered_in_form_order() {
        let mut draft = DocumentDraft::new_for(&settings(), DocumentKind::Invoice, today());
        draft.line_items = vec![line("first", "1", "1"), line("second", "1", "1")];
        let items = draft.to_new_line_items();
        assert_eq!(items[0].sort_order, 0);
        assert_eq!(items[1].sort_order, 1);
        assert_eq!(items[1].description, "second");
    }

    #[test]
    fn validation_requires_client_name_and_lines() {
        let mut draft = DocumentDraft::new_for(&settings(), DocumentKind::Invoice, today());
        assert!(draft.validate().is_err());

        draft.client.name = "Initech".to_string();
        assert!(draft.validate().is_ok());

        draft.line_items.clear();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn normalizing_rounds_to_stored_precision() {
        let mut draft = DocumentDraft::new_for(&settings(), DocumentKind::Invoice, today());
        draft.client.name = "Initech".to_string();
        draft.line_items = vec![line("licences", "1000", "0.12345")];
        draft.set_tax(true, d("12.345"));

        let draft = draft.normalized();
        let item = &draft.line_items[0];

        assert_eq!(item.rate, d("0.1235"));
        assert_eq!(item.amount, d("123.50"));
        assert_eq!(item.amount, line_amount(item.quantity, item.rate));
        assert_eq!(draft.tax_rate, d("12.35"));
        assert_eq!(draft.to_fields().tax_amount, d("15.25"));
    }
}
