use async_trait::async_trait;
use service_core::error::AppError;
use std::path::PathBuf;
use tokio::fs;

/// Blob storage for uploaded logos.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;

    /// Address the stored object is served from.
    fn public_url(&self, key: &str) -> String;

    /// Inverse of [`Storage::public_url`]; `None` for foreign URLs.
    fn key_from_url(&self, url: &str) -> Option<String>;
}

/// Files on local disk, served back by the HTTP layer under `/logos`.
pub struct LocalStorage {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invalid storage key: {}",
                key
            )));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError> {
        let path = self.path_for(key)?;
        fs::write(path, data)
            .await
            .map_err(|e| AppError::StorageError(anyhow::anyhow!("Failed to write {}: {}", key, e)))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(path).await.map_err(|e| {
                AppError::StorageError(anyhow::anyhow!("Failed to delete {}: {}", key, e))
            })?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/logos/{}", self.public_base_url, key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&format!("{}/logos/", self.public_base_url))
            .filter(|key| !key.is_empty() && !key.contains('/'))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_delete_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:8080/")
            .await
            .unwrap();

        storage.upload("logo.png", vec![1, 2, 3]).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("logo.png")).unwrap(), vec![1, 2, 3]);

        storage.delete("logo.png").await.unwrap();
        assert!(!dir.path().join("logo.png").exists());
        // Deleting a missing file is not an error.
        storage.delete("logo.png").await.unwrap();
    }

    #[tokio::test]
    async fn urls_map_back_to_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:8080")
            .await
            .unwrap();

        let url = storage.public_url("abc.png");
        assert_eq!(url, "http://localhost:8080/logos/abc.png");
        assert_eq!(storage.key_from_url(&url).as_deref(), Some("abc.png"));
        assert_eq!(storage.key_from_url("https://cdn.example.com/x.png"), None);
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_base_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost").await.unwrap();
        assert!(storage.upload("../evil.png", vec![0]).await.is_err());
    }
}
