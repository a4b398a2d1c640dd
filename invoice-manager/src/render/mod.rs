//! Printable rendering of documents.

mod export;
mod view;

pub use export::{HtmlPrintExporter, PageSetup, PaperSize, PrintExporter, PrintJob};
pub use view::{document_title, render_document, DocumentTemplate};
