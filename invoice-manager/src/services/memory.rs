//! In-process store used for local runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::store::Store;
use crate::models::{
    Client, CompanySettings, Document, DocumentFields, DocumentKind, LineItem, NewClient,
    NewLineItem, SettingsUpdate,
};

#[derive(Default)]
struct Tables {
    settings: Option<CompanySettings>,
    clients: HashMap<Uuid, Client>,
    documents: HashMap<Uuid, Document>,
    line_items: HashMap<Uuid, Vec<LineItem>>,
}

impl Tables {
    fn settings_mut(&mut self) -> &mut CompanySettings {
        self.settings
            .get_or_insert_with(|| CompanySettings::with_defaults(Uuid::new_v4(), Utc::now()))
    }
}

/// Store backed by a single lock over in-memory tables.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn get_or_create_settings(&self) -> Result<CompanySettings, AppError> {
        if let Some(settings) = self.tables.read().await.settings.clone() {
            return Ok(settings);
        }
        let mut tables = self.tables.write().await;
        Ok(tables.settings_mut().clone())
    }

    async fn update_settings(&self, update: &SettingsUpdate) -> Result<CompanySettings, AppError> {
        let mut tables = self.tables.write().await;
        let settings = tables.settings_mut();
        settings.apply(update);
        settings.updated_utc = Utc::now();
        Ok(settings.clone())
    }

    async fn set_logo_url(&self, logo_url: Option<&str>) -> Result<CompanySettings, AppError> {
        let mut tables = self.tables.write().await;
        let settings = tables.settings_mut();
        settings.logo_url = logo_url.map(str::to_string);
        settings.updated_utc = Utc::now();
        Ok(settings.clone())
    }

    async fn set_custom_units(&self, units: &[String]) -> Result<CompanySettings, AppError> {
        let mut tables = self.tables.write().await;
        let settings = tables.settings_mut();
        settings.custom_units = units.to_vec();
        settings.updated_utc = Utc::now();
        Ok(settings.clone())
    }

    #[instrument(skip(self), fields(kind = kind.as_str()))]
    async fn increment_counter(&self, kind: DocumentKind) -> Result<u32, AppError> {
        let mut tables = self.tables.write().await;
        let settings = tables.settings_mut();
        let counter = match kind {
            DocumentKind::Invoice => &mut settings.next_invoice_number,
            DocumentKind::Quote => &mut settings.next_quotation_number,
            DocumentKind::Proforma => &mut settings.next_proforma_number,
        };
        *counter += 1;
        let value = *counter;
        settings.updated_utc = Utc::now();
        debug!(value, "Counter incremented");
        Ok(value.max(0) as u32)
    }

    async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        let tables = self.tables.read().await;
        let mut clients: Vec<Client> = tables.clients.values().cloned().collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn get_client(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(self.tables.read().await.clients.get(&id).cloned())
    }

    async fn insert_client(&self, input: &NewClient) -> Result<Client, AppError> {
        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            tax_number: input.tax_number.clone(),
            pan_number: input.pan_number.clone(),
            created_utc: now,
            updated_utc: now,
        };
        self.tables
            .write()
            .await
            .clients
            .insert(client.id, client.clone());
        Ok(client)
    }

    async fn delete_client(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.tables.write().await.clients.remove(&id).is_some())
    }

    async fn list_documents(&self) -> Result<Vec<Document>, AppError> {
        let tables = self.tables.read().await;
        let mut documents: Vec<Document> = tables.documents.values().cloned().collect();
        documents.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(documents)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self.tables.read().await.documents.get(&id).cloned())
    }

    async fn insert_document(&self, fields: &DocumentFields) -> Result<Document, AppError> {
        let now = Utc::now();
        let document = Document::from_fields(Uuid::new_v4(), fields, now, now);
        self.tables
            .write()
            .await
            .documents
            .insert(document.id, document.clone());
        Ok(document)
    }

    async fn update_document(
        &self,
        id: Uuid,
        fields: &DocumentFields,
    ) -> Result<Option<Document>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.documents.get_mut(&id) else {
            return Ok(None);
        };
        *existing = Document::from_fields(id, fields, existing.created_utc, Utc::now());
        Ok(Some(existing.clone()))
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.tables.write().await.documents.remove(&id).is_some())
    }

    async fn get_line_items(&self, document_id: Uuid) -> Result<Vec<LineItem>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .line_items
            .get(&document_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_line_items(
        &self,
        document_id: Uuid,
        items: &[NewLineItem],
    ) -> Result<Vec<LineItem>, AppError> {
        let now = Utc::now();
        let mut rows: Vec<LineItem> = items
            .iter()
            .map(|item| LineItem {
                id: Uuid::new_v4(),
                document_id,
                description: item.description.clone(),
                unit: item.unit.clone(),
                quantity: item.quantity,
                rate: item.rate,
                amount: item.amount,
                sort_order: item.sort_order,
                created_utc: now,
            })
            .collect();
        rows.sort_by_key(|item| item.sort_order);

        let mut tables = self.tables.write().await;
        if !tables.documents.contains_key(&document_id) {
            return Err(AppError::NotFound(anyhow::anyhow!("Document not found")));
        }
        tables.line_items.insert(document_id, rows.clone());
        Ok(rows)
    }

    async fn delete_line_items(&self, document_id: Uuid) -> Result<u64, AppError> {
        let removed = self.tables.write().await.line_items.remove(&document_id);
        Ok(removed.map(|items| items.len() as u64).unwrap_or(0))
    }
}
