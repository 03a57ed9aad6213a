use std::sync::Arc;

pub mod readers;

// Re-export domain types for convenience
pub use cvtext_core::{
    DocumentFile, ExtractionConfig, ExtractionError, PdfExtractor, ProgressEvent, ProgressSink,
    Stage,
};
pub use readers::{read_document, read_plain_text};

#[cfg(feature = "pdf")]
pub use cvtext_ocr::TesseractEngine;

use cvtext_core::DocxConverter;

/// Extensions accepted by [`TextExtractor::extract_text`], without the dot.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "txt", "docx", "doc"];

/// Which reader a file is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
    /// DOCX and legacy DOC, both handed to the document converter.
    WordProcessing,
}

impl DocumentFormat {
    /// Classify a bare extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" => Some(DocumentFormat::PlainText),
            "docx" | "doc" => Some(DocumentFormat::WordProcessing),
            _ => None,
        }
    }

    /// Classify by whatever follows the last `.` of `filename`; `None` if
    /// unsupported. A bare `.pdf` counts as a PDF.
    pub fn from_filename(filename: &str) -> Option<Self> {
        filename
            .rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::PlainText => "text",
            DocumentFormat::WordProcessing => "docx",
        }
    }
}

/// Extract text from a PDF, DOCX/DOC, or TXT file.
///
/// Dispatches on the file's extension:
/// - `.pdf` → two-phase PDF engine (text layer, OCR fallback)
/// - `.txt` → plain-text reader
/// - `.docx` / `.doc` → document converter
/// - anything else → [`ExtractionError::UnsupportedFormat`], with no
///   collaborator touched
pub struct TextExtractor {
    pdf: PdfExtractor,
    docx: Arc<dyn DocxConverter>,
}

impl TextExtractor {
    pub fn new(pdf: PdfExtractor, docx: Arc<dyn DocxConverter>) -> Self {
        Self { pdf, docx }
    }

    /// MuPDF for PDFs, tesseract for OCR, the zip/XML converter for DOCX.
    #[cfg(feature = "pdf")]
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let pdf = PdfExtractor::new(
            Arc::new(cvtext_pdf_mupdf::MupdfLoader::new()),
            Arc::new(cvtext_ocr::TesseractEngine::from_config(config)),
        )
        .with_config(config);
        Self::new(pdf, Arc::new(cvtext_docx::DocxTextConverter::new()))
    }

    pub async fn extract_text(
        &self,
        file: &DocumentFile,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<String, ExtractionError> {
        let Some(format) = DocumentFormat::from_filename(file.name()) else {
            tracing::debug!(filename = file.name(), "unsupported file type");
            return Err(ExtractionError::UnsupportedFormat {
                filename: file.name().to_string(),
            });
        };

        tracing::debug!(filename = file.name(), format = format.as_str(), "routing file");
        match format {
            DocumentFormat::Pdf => self.pdf.extract(file, progress).await,
            DocumentFormat::PlainText => read_plain_text(file).await,
            DocumentFormat::WordProcessing => read_document(file, self.docx.as_ref()).await,
        }
    }
}
