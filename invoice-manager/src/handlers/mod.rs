pub mod clients;
pub mod documents;
pub mod health;
pub mod settings;

pub use clients::{create_client, delete_client, list_clients};
pub use documents::{
    close_draft, create_document, delete_document, get_document, list_documents, new_draft,
    number_preview, preview_document, preview_draft, save_status, track_draft, update_document,
};
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use settings::{
    add_unit, get_settings, list_units, remove_logo, remove_unit, update_settings, upload_logo,
};
