#![allow(dead_code)]

use invoice_manager::config::{
    AutoSaveSettings, InvoiceConfig, StorageConfig, StoreBackend, StoreConfig,
};
use invoice_manager::startup::Application;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use tempfile::TempDir;

/// Debounce used by spawned apps, short enough for wall-clock tests.
pub const TEST_DEBOUNCE_MS: u64 = 200;
pub const TEST_LOGO_MAX_BYTES: usize = 64 * 1024;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub storage_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let storage_dir = tempfile::tempdir().expect("Failed to create storage dir");

        let config = InvoiceConfig {
            common: CoreConfig { port: 0 },
            service_name: "invoice-manager-test".to_string(),
            log_level: "warn".to_string(),
            otlp_endpoint: None,
            store: StoreConfig {
                backend: StoreBackend::Memory,
                database_url: None,
                max_connections: 1,
                min_connections: 1,
            },
            storage: StorageConfig {
                local_path: storage_dir.path().to_string_lossy().to_string(),
                public_base_url: None,
                logo_max_bytes: TEST_LOGO_MAX_BYTES,
            },
            autosave: AutoSaveSettings {
                debounce_ms: TEST_DEBOUNCE_MS,
                max_attempts: 2,
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client
                .get(format!("{}/health", address))
                .send()
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
            storage_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn get_json(&self, path: &str) -> Value {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request");
        assert!(
            response.status().is_success(),
            "GET {} returned {}",
            path,
            response.status()
        );
        response.json().await.expect("Failed to parse JSON")
    }

    /// Fetch a blank form of `kind` and fill in a client and one line.
    pub async fn filled_draft(&self, kind: &str, client_name: &str) -> Value {
        let mut draft = self
            .get_json(&format!("/api/documents/new?kind={}", kind))
            .await;
        draft["client"]["name"] = json!(client_name);
        draft["line_items"] = json!([
            { "description": "Design work", "unit": "hour", "quantity": "4", "rate": "25.00" }
        ]);
        draft
    }

    /// Create a document and return the response body.
    pub async fn create_document(&self, kind: &str, client_name: &str) -> Value {
        let draft = self.filled_draft(kind, client_name).await;
        let response = self
            .client
            .post(self.url("/api/documents"))
            .json(&draft)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.expect("Failed to parse JSON")
    }
}

/// Read a money value regardless of its serialized scale.
pub fn money(value: &Value) -> rust_decimal::Decimal {
    let text = value.as_str().expect("money is serialized as a string");
    text.parse().expect("money parses as a decimal")
}

pub fn dec(text: &str) -> rust_decimal::Decimal {
    text.parse().expect("valid decimal literal")
}
