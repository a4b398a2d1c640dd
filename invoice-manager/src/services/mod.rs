//! Services module for invoice-manager.

pub mod autosave;
pub mod database;
pub mod documents;
pub mod memory;
pub mod metrics;
pub mod settings;
pub mod storage;
pub mod store;

pub use autosave::{AutoSaveConfig, AutoSaveScheduler, SaveStatus};
pub use database::Database;
pub use documents::{DocumentService, DocumentsByKind, PendingSave, SavedDocument};
pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use settings::{LogoUpload, SettingsService};
pub use storage::{LocalStorage, Storage};
pub use store::Store;
