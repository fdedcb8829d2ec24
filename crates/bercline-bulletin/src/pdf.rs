//! Text-layer extraction from bulletin PDFs via Pdfium.

use pdfium_render::prelude::{Pdfium, PdfiumError};

/// Error while pulling text out of a PDF.
#[derive(Debug)]
pub enum PdfError {
    /// Pdfium runtime could not be loaded
    Library(PdfiumError),
    /// The bytes are not a loadable PDF document
    Document(PdfiumError),
}

impl std::fmt::Display for PdfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Library(e) => write!(f, "pdfium runtime unavailable: {e}"),
            Self::Document(e) => write!(f, "unreadable PDF: {e}"),
        }
    }
}

impl std::error::Error for PdfError {}

/// Extract the UTF-8 text layer from a PDF byte slice.
///
/// Pages whose text cannot be read are skipped with a debug log; one bad
/// page never discards the rest of the bulletin.
pub fn extract_text(bytes: &[u8]) -> Result<String, PdfError> {
    let pdfium = load_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(PdfError::Document)?;

    let mut text = String::new();
    for (index, page) in document.pages().iter().enumerate() {
        match page.text() {
            Ok(page_text) => {
                text.push_str(&page_text.all());
                text.push('\n');
            }
            Err(e) => log::debug!("page {index}: text extraction failed: {e}"),
        }
    }
    Ok(text)
}

fn load_pdfium() -> Result<Pdfium, PdfError> {
    let bindings = Pdfium::bind_to_system_library().map_err(PdfError::Library)?;
    Ok(Pdfium::new(bindings))
}
