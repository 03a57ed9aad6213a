//! Collaborator seams: PDF parsing/rendering, OCR, and DOCX conversion.
//!
//! The pipeline only orchestrates these; concrete adapters live in their own
//! crates (`cvtext-pdf-mupdf`, `cvtext-ocr`, `cvtext-docx`).

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Boxed future returned by every collaborator method.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open document: {0}")]
    Open(String),
    #[error("page {page}: {reason}")]
    Page { page: usize, reason: String },
    #[error("failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },
    #[error("OCR failed: {0}")]
    Ocr(String),
    #[error("conversion failed: {0}")]
    Convert(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A rasterized page, PNG-encoded.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Opens PDF documents from raw bytes.
pub trait PdfLoader: Send + Sync {
    fn open<'a>(&'a self, bytes: &'a [u8])
    -> BoxFuture<'a, Result<Box<dyn PdfDocument>, BackendError>>;
}

/// An opened PDF. Page indices are 1-based.
///
/// Each call obtains its own page reference; a page handle used for the text
/// layer is never reused for rasterization.
pub trait PdfDocument: Send + Sync {
    /// Number of pages, fixed for the lifetime of the document.
    fn page_count(&self) -> usize;

    /// Text fragments of the page's embedded text layer, in reading order.
    fn text_content(&self, page: usize) -> BoxFuture<'_, Result<Vec<String>, BackendError>>;

    /// Rasterize the page at `scale` × its viewport.
    fn render(&self, page: usize, scale: f32) -> BoxFuture<'_, Result<RasterImage, BackendError>>;
}

/// Optical character recognition over a rasterized page.
pub trait OcrEngine: Send + Sync {
    /// Recognize the text in `image`. `on_progress` receives the engine's own
    /// recognition progress as a fraction in `0.0..=1.0`.
    fn recognize<'a>(
        &'a self,
        image: &'a RasterImage,
        on_progress: &'a (dyn Fn(f32) + Send + Sync),
    ) -> BoxFuture<'a, Result<String, BackendError>>;
}

/// Converts a word-processing document (DOCX/DOC) to raw text.
pub trait DocxConverter: Send + Sync {
    fn extract_raw_text<'a>(&'a self, bytes: &'a [u8]) -> BoxFuture<'a, Result<String, BackendError>>;
}
