use std::sync::Arc;

use mupdf::{Colorspace, Document, ImageFormat, Matrix, TextPageFlags};

use cvtext_core::{BackendError, BoxFuture, PdfDocument, PdfLoader, RasterImage};

/// MuPDF-based implementation of [`PdfLoader`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (which is AGPL-3.0) so that non-PDF code paths do not transitively
/// depend on it.
///
/// MuPDF handles are not `Send`, so every operation reopens the document from
/// the shared bytes on the blocking pool. Nothing MuPDF-owned outlives a
/// single call, and each text or render request gets its own page handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfLoader;

impl MupdfLoader {
    pub fn new() -> Self {
        Self
    }
}

impl PdfLoader for MupdfLoader {
    fn open<'a>(
        &'a self,
        bytes: &'a [u8],
    ) -> BoxFuture<'a, Result<Box<dyn PdfDocument>, BackendError>> {
        Box::pin(async move {
            if !looks_like_pdf(bytes) {
                return Err(BackendError::Open("missing %PDF- header".into()));
            }
            let bytes: Arc<[u8]> = Arc::from(bytes);
            let probe = Arc::clone(&bytes);
            let page_count = run_blocking(move || {
                let document = open_document(&probe)?;
                document
                    .page_count()
                    .map_err(|e| BackendError::Open(e.to_string()))
            })
            .await?;

            let page_count = usize::try_from(page_count).unwrap_or(0);
            tracing::debug!(bytes = bytes.len(), pages = page_count, "opened PDF with MuPDF");
            Ok(Box::new(MupdfDocument { bytes, page_count }) as Box<dyn PdfDocument>)
        })
    }
}

/// An opened PDF; holds only the raw bytes and the page count.
pub struct MupdfDocument {
    bytes: Arc<[u8]>,
    page_count: usize,
}

impl MupdfDocument {
    fn page_number(&self, page: usize) -> Result<i32, BackendError> {
        if page == 0 || page > self.page_count {
            return Err(BackendError::Page {
                page,
                reason: format!("out of range (document has {} pages)", self.page_count),
            });
        }
        i32::try_from(page - 1).map_err(|_| BackendError::Page {
            page,
            reason: "page number too large".into(),
        })
    }
}

impl PdfDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn text_content(&self, page: usize) -> BoxFuture<'_, Result<Vec<String>, BackendError>> {
        Box::pin(async move {
            let number = self.page_number(page)?;
            let bytes = Arc::clone(&self.bytes);
            run_blocking(move || page_fragments(&bytes, page, number)).await
        })
    }

    fn render(&self, page: usize, scale: f32) -> BoxFuture<'_, Result<RasterImage, BackendError>> {
        Box::pin(async move {
            let number = self.page_number(page)?;
            let bytes = Arc::clone(&self.bytes);
            run_blocking(move || render_page(&bytes, page, number, scale)).await
        })
    }
}

fn open_document(bytes: &[u8]) -> Result<Document, BackendError> {
    Document::from_bytes(bytes, "application/pdf").map_err(|e| BackendError::Open(e.to_string()))
}

/// One fragment per text line, in MuPDF's block/line reading order.
fn page_fragments(bytes: &[u8], page: usize, number: i32) -> Result<Vec<String>, BackendError> {
    let page_err = |e: mupdf::Error| BackendError::Page {
        page,
        reason: e.to_string(),
    };

    let document = open_document(bytes)?;
    let handle = document.load_page(number).map_err(page_err)?;
    let text_page = handle
        .to_text_page(TextPageFlags::empty())
        .map_err(page_err)?;

    let mut fragments = Vec::new();
    for block in text_page.blocks() {
        for line in block.lines() {
            let line_text: String = line
                .chars()
                .map(|c| c.char().unwrap_or('\u{FFFD}'))
                .collect();
            if !line_text.trim().is_empty() {
                fragments.push(expand_ligatures(&line_text));
            }
        }
    }
    Ok(fragments)
}

fn render_page(
    bytes: &[u8],
    page: usize,
    number: i32,
    scale: f32,
) -> Result<RasterImage, BackendError> {
    let render_err = |e: mupdf::Error| BackendError::Render {
        page,
        reason: e.to_string(),
    };

    let document = open_document(bytes)?;
    let handle = document.load_page(number).map_err(render_err)?;
    let pixmap = handle
        .to_pixmap(
            &Matrix::new_scale(scale, scale),
            &Colorspace::device_rgb(),
            false,
            true,
        )
        .map_err(render_err)?;

    let mut png = Vec::new();
    pixmap
        .write_to(&mut png, ImageFormat::PNG)
        .map_err(render_err)?;

    Ok(RasterImage {
        width: u32::try_from(pixmap.width()).unwrap_or(0),
        height: u32::try_from(pixmap.height()).unwrap_or(0),
        png,
    })
}

async fn run_blocking<T, F>(f: F) -> Result<T, BackendError>
where
    F: FnOnce() -> Result<T, BackendError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BackendError::Io(std::io::Error::other(e)))?
}

/// PDF files start with `%PDF-`, though some writers put junk before it;
/// MuPDF accepts the header anywhere in the first kilobyte.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

/// Expand common typographic ligatures found in PDFs.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}
