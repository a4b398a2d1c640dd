//! Company profile, units, logo and the client address book.

use std::path::Path;
use std::sync::Arc;

use service_core::error::AppError;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::storage::Storage;
use super::store::Store;
use crate::models::{Client, CompanySettings, NewClient, SettingsUpdate};

/// An uploaded logo as received from the client.
pub struct LogoUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn Store>,
    storage: Arc<dyn Storage>,
    logo_max_bytes: usize,
}

impl SettingsService {
    pub fn new(store: Arc<dyn Store>, storage: Arc<dyn Storage>, logo_max_bytes: usize) -> Self {
        Self {
            store,
            storage,
            logo_max_bytes,
        }
    }

    pub async fn get(&self) -> Result<CompanySettings, AppError> {
        self.store.get_or_create_settings().await
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, update: SettingsUpdate) -> Result<CompanySettings, AppError> {
        let update = update.normalized();
        update.validate()?;
        let settings = self.store.update_settings(&update).await?;
        info!(company_name = %settings.company_name, "Settings saved");
        Ok(settings)
    }

    /// Default units followed by the custom ones.
    pub async fn units(&self) -> Result<Vec<String>, AppError> {
        Ok(self.get().await?.available_units())
    }

    #[instrument(skip(self))]
    pub async fn add_unit(&self, unit: &str) -> Result<CompanySettings, AppError> {
        let unit = unit.trim();
        if unit.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Unit name is required")));
        }

        let settings = self.get().await?;
        if settings
            .available_units()
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(unit))
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Unit '{}' already exists",
                unit
            )));
        }

        let mut units = settings.custom_units;
        units.push(unit.to_string());
        self.store.set_custom_units(&units).await
    }

    /// Remove a custom unit by its position among the custom units.
    #[instrument(skip(self))]
    pub async fn remove_unit(&self, index: usize) -> Result<CompanySettings, AppError> {
        let mut units = self.get().await?.custom_units;
        if index >= units.len() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "No custom unit at position {}",
                index
            )));
        }
        let removed = units.remove(index);
        info!(unit = %removed, "Custom unit removed");
        self.store.set_custom_units(&units).await
    }

    /// Store a new logo and point the settings at it.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.data.len()))]
    pub async fn upload_logo(&self, upload: LogoUpload) -> Result<CompanySettings, AppError> {
        if !upload.content_type.starts_with("image/") {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Logo must be an image, got {}",
                upload.content_type
            )));
        }
        if upload.data.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Logo file is empty")));
        }
        if upload.data.len() > self.logo_max_bytes {
            return Err(AppError::PayloadTooLarge(anyhow::anyhow!(
                "Logo exceeds {} bytes",
                self.logo_max_bytes
            )));
        }

        let key = logo_key(&upload.file_name);
        self.storage.upload(&key, upload.data).await.map_err(|e| {
            tracing::error!("Failed to store logo {}: {}", key, e);
            e
        })?;

        let previous = self.get().await?.logo_url;
        let url = self.storage.public_url(&key);
        let settings = self.store.set_logo_url(Some(url.as_str())).await?;

        if let Some(url) = previous {
            self.discard_logo(&url).await;
        }
        info!(logo_key = %key, "Logo uploaded");

        Ok(settings)
    }

    #[instrument(skip(self))]
    pub async fn remove_logo(&self) -> Result<CompanySettings, AppError> {
        let previous = self.get().await?.logo_url;
        let settings = self.store.set_logo_url(None).await?;
        if let Some(url) = previous {
            self.discard_logo(&url).await;
        }
        Ok(settings)
    }

    /// Best-effort removal of a stored logo file.
    async fn discard_logo(&self, url: &str) {
        let Some(key) = self.storage.key_from_url(url) else {
            return;
        };
        if let Err(e) = self.storage.delete(&key).await {
            warn!(logo_key = %key, error = %e, "Failed to delete old logo");
        }
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        self.store.list_clients().await
    }

    #[instrument(skip(self, input))]
    pub async fn add_client(&self, input: NewClient) -> Result<Client, AppError> {
        let input = input.normalized();
        input.validate()?;
        self.store.insert_client(&input).await
    }

    #[instrument(skip(self), fields(client_id = %id))]
    pub async fn delete_client(&self, id: Uuid) -> Result<(), AppError> {
        if !self.store.delete_client(id).await? {
            return Err(AppError::NotFound(anyhow::anyhow!("Client not found")));
        }
        info!("Client deleted");
        Ok(())
    }
}

/// Random file name that keeps the upload's extension.
fn logo_key(file_name: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}
