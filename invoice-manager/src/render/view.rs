use askama::Template;
use chrono::NaiveDate;
use service_core::error::AppError;

use crate::currency::{format_money, format_quantity};
use crate::models::{CompanySettings, Document, LineItem};

pub struct PartyView {
    pub name: String,
    pub lines: Vec<String>,
}

pub struct RowView {
    pub description: String,
    pub unit: String,
    pub quantity: String,
    pub rate: String,
    pub amount: String,
}

pub struct TaxLineView {
    pub label: String,
    pub amount: String,
}

pub struct BankView {
    pub name: String,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
}

/// Fixed A4 layout of a document, every value preformatted.
#[derive(Template)]
#[template(path = "document.html")]
pub struct DocumentTemplate {
    pub logo_url: Option<String>,
    pub heading: &'static str,
    pub document_number: String,
    pub issue_date: String,
    pub due_date: Option<String>,
    pub company: PartyView,
    pub client: PartyView,
    pub rows: Vec<RowView>,
    pub subtotal: String,
    pub tax_line: Option<TaxLineView>,
    pub total: String,
    pub bank: Option<BankView>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
}

fn display_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

impl DocumentTemplate {
    pub fn new(document: &Document, items: &[LineItem], settings: &CompanySettings) -> Self {
        let currency = document.currency.as_str();

        let mut company_lines = Vec::new();
        company_lines.extend(settings.company_email.clone());
        company_lines.extend(settings.company_phone.clone());
        company_lines.extend(settings.company_address.clone());
        company_lines.extend(settings.tax_number.as_ref().map(|n| format!("GST: {}", n)));
        company_lines.extend(settings.pan_number.as_ref().map(|n| format!("PAN: {}", n)));

        let client = &document.client;
        let mut client_lines = Vec::new();
        client_lines.extend(client.email.clone());
        client_lines.extend(client.address.clone());
        client_lines.extend(client.tax_number.as_ref().map(|n| format!("GST: {}", n)));
        client_lines.extend(client.pan_number.as_ref().map(|n| format!("PAN: {}", n)));

        let rows = items
            .iter()
            .map(|item| RowView {
                description: item.description.clone(),
                unit: item.unit.clone(),
                quantity: format_quantity(item.quantity),
                rate: format_money(currency, item.rate),
                amount: format_money(currency, item.amount),
            })
            .collect();

        let tax_line = document.tax_enabled.then(|| TaxLineView {
            label: format!("GST ({}%)", format_quantity(document.tax_rate)),
            amount: format_money(currency, document.tax_amount),
        });

        let bank = settings.bank_name.as_ref().map(|name| BankView {
            name: name.clone(),
            account_number: settings.account_number.clone(),
            ifsc_code: settings.ifsc_code.clone(),
        });

        Self {
            logo_url: settings.logo_url.clone(),
            heading: document.kind.heading(),
            document_number: document.document_number.clone(),
            issue_date: display_date(document.issue_date),
            due_date: document.due_date.map(display_date),
            company: PartyView {
                name: settings.company_name.clone(),
                lines: company_lines,
            },
            client: PartyView {
                name: client.name.clone(),
                lines: client_lines,
            },
            rows,
            subtotal: format_money(currency, document.subtotal),
            tax_line,
            total: format_money(currency, document.total),
            bank,
            payment_terms: document.payment_terms.clone(),
            notes: document.notes.clone(),
        }
    }
}

/// Render the printable HTML fragment of a document.
pub fn render_document(
    document: &Document,
    items: &[LineItem],
    settings: &CompanySettings,
) -> Result<String, AppError> {
    DocumentTemplate::new(document, items, settings)
        .render()
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to render document: {}", e)))
}

/// Export title, e.g. `Proforma-Invoice-PI0003250601`.
pub fn document_title(document: &Document) -> String {
    format!("{}-{}", document.kind.title_prefix(), document.document_number)
}
