//! Hand-off of a rendered document to whatever prints it.

use service_core::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperSize {
    A4,
}

impl PaperSize {
    fn css(&self) -> &'static str {
        match self {
            PaperSize::A4 => "A4",
        }
    }
}

/// Page options handed to the exporter unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSetup {
    pub size: PaperSize,
    pub margin_mm: u32,
    /// Print backgrounds and colours exactly as rendered.
    pub exact_colors: bool,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            size: PaperSize::A4,
            margin_mm: 0,
            exact_colors: true,
        }
    }
}

impl PageSetup {
    pub fn page_style(&self) -> String {
        let mut css = format!(
            "@page {{ size: {}; margin: {}; }}",
            self.size.css(),
            if self.margin_mm == 0 {
                "0".to_string()
            } else {
                format!("{}mm", self.margin_mm)
            }
        );
        if self.exact_colors {
            css.push_str(
                " @media print { body { -webkit-print-color-adjust: exact; print-color-adjust: exact; } }",
            );
        }
        css
    }
}

/// A rendered document ready for printing.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub title: String,
    pub fragment: String,
    pub page: PageSetup,
}

pub trait PrintExporter: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn export(&self, job: &PrintJob) -> Result<Vec<u8>, AppError>;
}

/// Wraps the fragment in a standalone page the browser can print to PDF.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPrintExporter;

fn escape_title(title: &str) -> String {
    title
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl PrintExporter for HtmlPrintExporter {
    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }

    fn export(&self, job: &PrintJob) -> Result<Vec<u8>, AppError> {
        let page = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{}</title>\n<style>{} body {{ margin: 0; }}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            escape_title(&job.title),
            job.page.page_style(),
            job.fragment
        );
        Ok(page.into_bytes())
    }
}
