//! Record store abstraction shared by the PostgreSQL and in-memory backends.

use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    Client, CompanySettings, Document, DocumentFields, DocumentKind, LineItem, NewClient,
    NewLineItem, SettingsUpdate,
};

#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // Settings

    /// Load the settings row, inserting the defaults if there is none yet.
    async fn get_or_create_settings(&self) -> Result<CompanySettings, AppError>;

    async fn update_settings(&self, update: &SettingsUpdate) -> Result<CompanySettings, AppError>;

    async fn set_logo_url(&self, logo_url: Option<&str>) -> Result<CompanySettings, AppError>;

    async fn set_custom_units(&self, units: &[String]) -> Result<CompanySettings, AppError>;

    /// Read-then-write increment of one counter; returns the new value.
    async fn increment_counter(&self, kind: DocumentKind) -> Result<u32, AppError>;

    // Clients

    async fn list_clients(&self) -> Result<Vec<Client>, AppError>;

    async fn get_client(&self, id: Uuid) -> Result<Option<Client>, AppError>;

    async fn insert_client(&self, input: &NewClient) -> Result<Client, AppError>;

    /// Returns false when no such client exists.
    async fn delete_client(&self, id: Uuid) -> Result<bool, AppError>;

    // Documents

    /// Every document, newest first.
    async fn list_documents(&self) -> Result<Vec<Document>, AppError>;

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, AppError>;

    async fn insert_document(&self, fields: &DocumentFields) -> Result<Document, AppError>;

    async fn update_document(
        &self,
        id: Uuid,
        fields: &DocumentFields,
    ) -> Result<Option<Document>, AppError>;

    async fn delete_document(&self, id: Uuid) -> Result<bool, AppError>;

    // Line items

    /// Lines of a document in `sort_order`.
    async fn get_line_items(&self, document_id: Uuid) -> Result<Vec<LineItem>, AppError>;

    /// Swap every line of a document for `items` in one step.
    async fn replace_line_items(
        &self,
        document_id: Uuid,
        items: &[NewLineItem],
    ) -> Result<Vec<LineItem>, AppError>;

    async fn delete_line_items(&self, document_id: Uuid) -> Result<u64, AppError>;
}
