pub mod documents;
pub mod settings;

pub use documents::{
    DocumentListResponse, DocumentResponse, DocumentSummary, DraftResponse, KindQuery,
    NumberPreviewResponse, SaveStatusResponse,
};
pub use settings::{UnitRequest, UnitsResponse};
