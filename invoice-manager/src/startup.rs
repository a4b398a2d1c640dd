use crate::config::{InvoiceConfig, StoreBackend};
use crate::handlers;
use crate::render::{HtmlPrintExporter, PrintExporter};
use crate::services::{
    AutoSaveScheduler, Database, DocumentService, LocalStorage, MemoryStore, SettingsService,
    Storage, Store,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Headroom over the logo limit for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: InvoiceConfig,
    pub store: Arc<dyn Store>,
    pub documents: DocumentService,
    pub settings: SettingsService,
    pub autosave: AutoSaveScheduler,
    pub exporter: Arc<dyn PrintExporter>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: InvoiceConfig) -> Result<Self, AppError> {
        let store = connect_store(&config).await?;

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        let storage = LocalStorage::new(
            &config.storage.local_path,
            config.public_base_url(port),
        )
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to initialize local storage at {}: {}",
                config.storage.local_path,
                e
            );
            e
        })?;
        let logo_dir = storage.base_path().clone();
        let storage: Arc<dyn Storage> = Arc::new(storage);

        let documents = DocumentService::new(store.clone());
        let state = AppState {
            config: config.clone(),
            store: store.clone(),
            documents: documents.clone(),
            settings: SettingsService::new(
                store.clone(),
                storage,
                config.storage.logo_max_bytes,
            ),
            autosave: AutoSaveScheduler::new(documents, config.autosave.to_config()),
            exporter: Arc::new(HtmlPrintExporter),
        };

        let app = router(state.clone(), logo_dir);

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn connect_store(config: &InvoiceConfig) -> Result<Arc<dyn Store>, AppError> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config.store.database_url.as_deref().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required for postgres"))
            })?;
            let db = Database::new(
                url,
                config.store.max_connections,
                config.store.min_connections,
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to PostgreSQL: {}", e);
                e
            })?;
            db.run_migrations().await?;
            Ok(Arc::new(db))
        }
    }
}

fn router(state: AppState, logo_dir: std::path::PathBuf) -> Router {
    let body_limit = state.config.storage.logo_max_bytes + MULTIPART_OVERHEAD;

    let api = Router::new()
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route(
            "/settings/logo",
            post(handlers::upload_logo)
                .delete(handlers::remove_logo)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/settings/units", post(handlers::add_unit))
        .route(
            "/settings/units/:index",
            axum::routing::delete(handlers::remove_unit),
        )
        .route("/units", get(handlers::list_units))
        .route(
            "/clients",
            get(handlers::list_clients).post(handlers::create_client),
        )
        .route("/clients/:id", axum::routing::delete(handlers::delete_client))
        .route(
            "/documents",
            get(handlers::list_documents).post(handlers::create_document),
        )
        .route("/documents/new", get(handlers::new_draft))
        .route("/documents/number-preview", get(handlers::number_preview))
        .route("/documents/preview", post(handlers::preview_draft))
        .route(
            "/documents/:id",
            get(handlers::get_document)
                .put(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .route(
            "/documents/:id/draft",
            put(handlers::track_draft).delete(handlers::close_draft),
        )
        .route("/documents/:id/save-status", get(handlers::save_status))
        .route("/documents/:id/preview", get(handlers::preview_document));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest("/api", api)
        .nest_service("/logos", ServeDir::new(logo_dir))
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
