//! Two-phase PDF text extraction.
//!
//! Phase 1 reads every page's embedded text layer concurrently. If the
//! aggregate is too sparse to be useful (scanned or image-only résumés), it is
//! discarded wholesale and phase 2 rasterizes and OCRs each page, strictly one
//! page at a time.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;

use crate::backend::{BackendError, OcrEngine, PdfDocument, PdfLoader};
use crate::progress::{ProgressReporter, ProgressSink, Stage};
use crate::text_utils::{has_usable_text, join_fragments, join_pages};
use crate::{DEFAULT_MIN_TEXT_CHARS, DEFAULT_OCR_SCALE, DocumentFile, ExtractionConfig};
use crate::{ExtractionError, PageResult};

/// Orchestrates the PDF, rendering and OCR collaborators for one file at a time.
///
/// Holds no per-request state; concurrent calls for different files are
/// independent and each opens its own document.
pub struct PdfExtractor {
    loader: Arc<dyn PdfLoader>,
    ocr: Arc<dyn OcrEngine>,
    min_text_chars: usize,
    ocr_scale: f32,
}

impl PdfExtractor {
    pub fn new(loader: Arc<dyn PdfLoader>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            loader,
            ocr,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            ocr_scale: DEFAULT_OCR_SCALE,
        }
    }

    pub fn with_config(mut self, config: &ExtractionConfig) -> Self {
        self.min_text_chars = config.min_text_chars;
        self.ocr_scale = config.ocr_scale;
        self
    }

    /// Extract the text of a PDF.
    ///
    /// Returns the text-layer aggregate when it exceeds the threshold,
    /// otherwise the OCR aggregate. An empty string means the document opened
    /// fine but nothing readable came out of either phase.
    pub async fn extract(
        &self,
        file: &DocumentFile,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<String, ExtractionError> {
        let filename = file.name();
        let reporter = ProgressReporter::new(progress);

        let result = self.run(file, &reporter).await;
        if let Err(cause) = &result {
            tracing::warn!(
                filename,
                stage = reporter.stage().map(|s| s.as_str()).unwrap_or("-"),
                error = %cause,
                "PDF extraction failed"
            );
        }
        result.map_err(|cause| ExtractionError::PdfParseFailure {
            filename: filename.to_string(),
            cause,
        })
    }

    async fn run(
        &self,
        file: &DocumentFile,
        reporter: &ProgressReporter<'_>,
    ) -> Result<String, BackendError> {
        reporter.enter(Stage::Loading, 0.0, 100, "Loading PDF...".to_string());

        let bytes = file.read_bytes().await?;
        let document = self.loader.open(&bytes).await?;
        drop(bytes);

        let page_count = document.page_count();
        tracing::debug!(filename = file.name(), pages = page_count, "document opened");

        reporter.enter(
            Stage::Extracting,
            0.0,
            page_count,
            format!("Extracting text from {page_count} pages..."),
        );
        let pages = read_text_layer(document.as_ref(), page_count, reporter).await?;
        let aggregate = join_pages(pages.iter().map(|p| p.text.as_str()));

        if has_usable_text(&aggregate, self.min_text_chars) {
            tracing::info!(
                filename = file.name(),
                pages = page_count,
                chars = aggregate.len(),
                "text layer accepted"
            );
            reporter.enter(
                Stage::Complete,
                page_count as f64,
                page_count,
                "Text extraction complete".to_string(),
            );
            return Ok(aggregate);
        }

        tracing::info!(
            filename = file.name(),
            pages = page_count,
            chars = aggregate.len(),
            threshold = self.min_text_chars,
            "text layer too sparse, falling back to OCR"
        );
        drop(pages);

        let text = self
            .recognize_pages(document.as_ref(), page_count, reporter)
            .await?;

        tracing::info!(
            filename = file.name(),
            pages = page_count,
            chars = text.len(),
            "OCR complete"
        );
        reporter.enter(
            Stage::Complete,
            page_count as f64,
            page_count,
            "OCR complete".to_string(),
        );
        Ok(text)
    }

    /// Rasterize and OCR each page in order, one page in flight at a time.
    async fn recognize_pages(
        &self,
        document: &dyn PdfDocument,
        page_count: usize,
        reporter: &ProgressReporter<'_>,
    ) -> Result<String, BackendError> {
        reporter.enter(
            Stage::Ocr,
            0.0,
            page_count,
            format!("Running OCR on {page_count} pages..."),
        );

        let mut texts = Vec::with_capacity(page_count);
        for page_index in 1..=page_count {
            let image = document.render(page_index, self.ocr_scale).await?;
            tracing::debug!(
                page = page_index,
                width = image.width,
                height = image.height,
                "page rasterized"
            );

            let base = (page_index - 1) as f64;
            let on_fraction = |fraction: f32| {
                let fraction = if fraction.is_finite() {
                    f64::from(fraction.clamp(0.0, 1.0))
                } else {
                    0.0
                };
                reporter.report(
                    base + fraction,
                    page_count,
                    format!(
                        "OCR page {page_index} of {page_count} ({:.0}%)",
                        fraction * 100.0
                    ),
                );
            };
            let text = self.ocr.recognize(&image, &on_fraction).await?;
            drop(image);

            let text = text.trim().to_string();
            tracing::debug!(page = page_index, chars = text.len(), "page recognized");
            texts.push(text);
        }

        Ok(join_pages(&texts))
    }
}

/// Request every page's text layer at once; assemble the results in page order
/// whatever order they complete in.
async fn read_text_layer(
    document: &dyn PdfDocument,
    page_count: usize,
    reporter: &ProgressReporter<'_>,
) -> Result<Vec<PageResult>, BackendError> {
    let mut pending: FuturesUnordered<_> = (1..=page_count)
        .map(|page_index| async move {
            let fragments = document.text_content(page_index).await?;
            Ok::<_, BackendError>(PageResult {
                page_index,
                text: join_fragments(&fragments),
            })
        })
        .collect();

    let mut slots: Vec<Option<PageResult>> = (0..page_count).map(|_| None).collect();
    while let Some(result) = pending.next().await {
        let page = result?;
        tracing::debug!(
            page = page.page_index,
            chars = page.text.len(),
            "text layer read"
        );
        reporter.report(
            page.page_index as f64,
            page_count,
            format!("Extracted page {} of {}", page.page_index, page_count),
        );
        let slot = page.page_index - 1;
        slots[slot] = Some(page);
    }

    Ok(slots.into_iter().flatten().collect())
}
