//! Create, load, save and delete documents.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use service_core::error::AppError;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::metrics::record_document_created;
use super::store::Store;
use crate::models::{
    Document, DocumentDraft, DocumentFields, DocumentKind, LineItem, NewLineItem,
};
use crate::numbering::document_number;
use crate::render::{document_title, render_document, PageSetup, PrintJob};

/// A document together with its lines.
#[derive(Debug, Clone)]
pub struct SavedDocument {
    pub document: Document,
    pub line_items: Vec<LineItem>,
}

/// Everything one write of an existing document needs, totals included.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub document_id: Uuid,
    pub fields: DocumentFields,
    pub line_items: Vec<NewLineItem>,
}

impl PendingSave {
    pub fn from_draft(document_id: Uuid, draft: &DocumentDraft) -> Self {
        Self {
            document_id,
            fields: draft.to_fields(),
            line_items: draft.to_new_line_items(),
        }
    }
}

/// Documents split by kind, each newest first.
#[derive(Debug, Clone, Default)]
pub struct DocumentsByKind {
    pub invoices: Vec<Document>,
    pub quotes: Vec<Document>,
    pub proformas: Vec<Document>,
}

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn Store>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<DocumentsByKind, AppError> {
        let mut lists = DocumentsByKind::default();
        for document in self.store.list_documents().await? {
            match document.kind {
                DocumentKind::Invoice => lists.invoices.push(document),
                DocumentKind::Quote => lists.quotes.push(document),
                DocumentKind::Proforma => lists.proformas.push(document),
            }
        }
        Ok(lists)
    }

    #[instrument(skip(self), fields(document_id = %id))]
    pub async fn load(&self, id: Uuid) -> Result<SavedDocument, AppError> {
        let document = self
            .store
            .get_document(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;
        let line_items = self.store.get_line_items(id).await?;
        Ok(SavedDocument {
            document,
            line_items,
        })
    }

    /// Load a saved document back into form state.
    pub async fn load_draft(&self, id: Uuid) -> Result<DocumentDraft, AppError> {
        let saved = self.load(id).await?;
        Ok(DocumentDraft::from_saved(&saved.document, &saved.line_items))
    }

    /// Number the next document of `kind` would get if created on `today`.
    pub async fn preview_number(
        &self,
        kind: DocumentKind,
        today: NaiveDate,
    ) -> Result<String, AppError> {
        let settings = self.store.get_or_create_settings().await?;
        Ok(document_number(kind, settings.counter_for(kind), today))
    }

    pub async fn new_draft(
        &self,
        kind: DocumentKind,
        today: NaiveDate,
    ) -> Result<DocumentDraft, AppError> {
        let settings = self.store.get_or_create_settings().await?;
        Ok(DocumentDraft::new_for(&settings, kind, today))
    }

    /// First save of a new document.
    ///
    /// Inserts the header, bumps the counter for its kind, then writes the
    /// lines. These are separate writes; a failure part way leaves the
    /// earlier ones in place.
    #[instrument(skip(self, draft), fields(kind = draft.kind.as_str()))]
    pub async fn create(
        &self,
        draft: DocumentDraft,
        today: NaiveDate,
    ) -> Result<SavedDocument, AppError> {
        let mut draft = draft.normalized();
        draft.validate()?;

        if draft.document_number.trim().is_empty() {
            let settings = self.store.get_or_create_settings().await?;
            draft.document_number =
                document_number(draft.kind, settings.counter_for(draft.kind), today);
        }

        let document = self.store.insert_document(&draft.to_fields()).await?;

        if let Err(e) = self.store.increment_counter(draft.kind).await {
            warn!(document_id = %document.id, error = %e, "Document saved but counter not advanced");
            return Err(e);
        }

        let line_items = self
            .store
            .replace_line_items(document.id, &draft.to_new_line_items())
            .await?;

        record_document_created(document.kind);
        info!(
            document_id = %document.id,
            document_number = %document.document_number,
            total = %document.total,
            "Document created"
        );

        Ok(SavedDocument {
            document,
            line_items,
        })
    }

    /// Manual save of an existing document.
    #[instrument(skip(self, draft), fields(document_id = %id))]
    pub async fn update(&self, id: Uuid, draft: DocumentDraft) -> Result<SavedDocument, AppError> {
        let draft = draft.normalized();
        draft.validate()?;
        self.persist(&PendingSave::from_draft(id, &draft)).await
    }

    /// Write header and lines of an existing document; counters are never touched.
    #[instrument(skip(self, save), fields(document_id = %save.document_id))]
    pub async fn persist(&self, save: &PendingSave) -> Result<SavedDocument, AppError> {
        let document = self
            .store
            .update_document(save.document_id, &save.fields)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;

        let line_items = self
            .store
            .replace_line_items(save.document_id, &save.line_items)
            .await?;

        info!(total = %document.total, lines = line_items.len(), "Document saved");

        Ok(SavedDocument {
            document,
            line_items,
        })
    }

    /// Printable form of a saved document.
    #[instrument(skip(self), fields(document_id = %id))]
    pub async fn print_job(&self, id: Uuid) -> Result<PrintJob, AppError> {
        let saved = self.load(id).await?;
        let settings = self.store.get_or_create_settings().await?;
        Ok(PrintJob {
            title: document_title(&saved.document),
            fragment: render_document(&saved.document, &saved.line_items, &settings)?,
            page: PageSetup::default(),
        })
    }

    /// Printable form of unsaved form state, with totals computed fresh.
    pub async fn preview_draft(
        &self,
        draft: DocumentDraft,
        today: NaiveDate,
    ) -> Result<PrintJob, AppError> {
        let settings = self.store.get_or_create_settings().await?;
        let mut draft = draft.normalized();
        if draft.document_number.trim().is_empty() {
            draft.document_number =
                document_number(draft.kind, settings.counter_for(draft.kind), today);
        }

        let now = Utc::now();
        let id = draft.id.unwrap_or_else(Uuid::nil);
        let document = Document::from_fields(id, &draft.to_fields(), now, now);
        let line_items: Vec<LineItem> = draft
            .to_new_line_items()
            .into_iter()
            .map(|item| LineItem {
                id: Uuid::nil(),
                document_id: id,
                description: item.description,
                unit: item.unit,
                quantity: item.quantity,
                rate: item.rate,
                amount: item.amount,
                sort_order: item.sort_order,
                created_utc: now,
            })
            .collect();

        Ok(PrintJob {
            title: document_title(&document),
            fragment: render_document(&document, &line_items, &settings)?,
            page: PageSetup::default(),
        })
    }

    /// Delete lines, then the document.
    #[instrument(skip(self), fields(document_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if self.store.get_document(id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!("Document not found")));
        }
        self.store.delete_line_items(id).await?;
        if !self.store.delete_document(id).await? {
            return Err(AppError::NotFound(anyhow::anyhow!("Document not found")));
        }
        info!("Document deleted");
        Ok(())
    }
}
