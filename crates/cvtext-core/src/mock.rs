//! Mock collaborators for testing the extraction pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backend::{
    BackendError, BoxFuture, DocxConverter, OcrEngine, PdfDocument, PdfLoader, RasterImage,
};
use crate::progress::{ProgressEvent, ProgressSink, Stage};

/// One page of a [`MockLoader`] document.
#[derive(Clone, Debug, Default)]
pub struct MockPage {
    fragments: Vec<String>,
    delay: Option<Duration>,
    text_error: Option<String>,
    render_error: Option<String>,
}

impl MockPage {
    /// A page whose text layer holds `fragments`.
    pub fn text(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    /// A page with no text layer (scanned image).
    pub fn blank() -> Self {
        Self::default()
    }

    /// A page whose text-layer read fails.
    pub fn failing(reason: &str) -> Self {
        Self {
            text_error: Some(reason.to_string()),
            ..Default::default()
        }
    }

    /// Delay the text-layer read, to force out-of-order completion.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make rasterizing this page fail.
    pub fn failing_render(mut self, reason: &str) -> Self {
        self.render_error = Some(reason.to_string());
        self
    }
}

/// Tracks how many operations of one kind are in flight at once.
#[derive(Debug, Default)]
struct Concurrency {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Concurrency {
    fn enter(&self) -> InFlight<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        InFlight(self)
    }

    fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a Concurrency);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct LoaderStats {
    open_calls: AtomicUsize,
    text_reads: Concurrency,
    renders: Concurrency,
    rendered: Mutex<Vec<(usize, f32)>>,
}

/// A hand-rolled [`PdfLoader`] serving a fixed set of pages.
///
/// Every opened document shares the loader's call counters.
pub struct MockLoader {
    pages: Arc<Vec<MockPage>>,
    open_error: Option<String>,
    stats: Arc<LoaderStats>,
}

impl MockLoader {
    pub fn new(pages: Vec<MockPage>) -> Self {
        Self {
            pages: Arc::new(pages),
            open_error: None,
            stats: Arc::default(),
        }
    }

    /// A loader that rejects every document.
    pub fn failing_open(reason: &str) -> Self {
        Self {
            open_error: Some(reason.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn open_calls(&self) -> usize {
        self.stats.open_calls.load(Ordering::SeqCst)
    }

    pub fn render_calls(&self) -> usize {
        self.stats.rendered.lock().unwrap().len()
    }

    /// Pages passed to `render`, in call order.
    pub fn rendered_pages(&self) -> Vec<usize> {
        self.stats
            .rendered
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| *p)
            .collect()
    }

    pub fn render_scales(&self) -> Vec<f32> {
        self.stats
            .rendered
            .lock()
            .unwrap()
            .iter()
            .map(|(_, s)| *s)
            .collect()
    }

    pub fn max_concurrent_text_reads(&self) -> usize {
        self.stats.text_reads.max()
    }

    pub fn max_concurrent_renders(&self) -> usize {
        self.stats.renders.max()
    }
}

impl PdfLoader for MockLoader {
    fn open<'a>(
        &'a self,
        _bytes: &'a [u8],
    ) -> BoxFuture<'a, Result<Box<dyn PdfDocument>, BackendError>> {
        self.stats.open_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if let Some(reason) = &self.open_error {
                return Err(BackendError::Open(reason.clone()));
            }
            Ok(Box::new(MockDocument {
                pages: Arc::clone(&self.pages),
                stats: Arc::clone(&self.stats),
            }) as Box<dyn PdfDocument>)
        })
    }
}

struct MockDocument {
    pages: Arc<Vec<MockPage>>,
    stats: Arc<LoaderStats>,
}

impl MockDocument {
    fn page(&self, page: usize) -> Result<&MockPage, BackendError> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .ok_or_else(|| BackendError::Page {
                page,
                reason: "page out of range".to_string(),
            })
    }
}

impl PdfDocument for MockDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn text_content(&self, page: usize) -> BoxFuture<'_, Result<Vec<String>, BackendError>> {
        Box::pin(async move {
            let _in_flight = self.stats.text_reads.enter();
            let mock = self.page(page)?;
            // Let sibling reads start before this one finishes.
            tokio::task::yield_now().await;
            if let Some(d) = mock.delay {
                tokio::time::sleep(d).await;
            }
            match &mock.text_error {
                Some(reason) => Err(BackendError::Page {
                    page,
                    reason: reason.clone(),
                }),
                None => Ok(mock.fragments.clone()),
            }
        })
    }

    fn render(&self, page: usize, scale: f32) -> BoxFuture<'_, Result<RasterImage, BackendError>> {
        Box::pin(async move {
            let _in_flight = self.stats.renders.enter();
            self.stats.rendered.lock().unwrap().push((page, scale));
            let mock = self.page(page)?;
            tokio::task::yield_now().await;
            if let Some(reason) = &mock.render_error {
                return Err(BackendError::Render {
                    page,
                    reason: reason.clone(),
                });
            }
            Ok(RasterImage {
                width: (612.0 * scale) as u32,
                height: (792.0 * scale) as u32,
                png: Vec::new(),
            })
        })
    }
}

/// A configurable mock response for [`MockOcr`].
#[derive(Clone, Debug)]
pub struct MockOcrResponse {
    result: Result<String, String>,
    delay: Option<Duration>,
    progress: Vec<f32>,
}

impl MockOcrResponse {
    pub fn text(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            delay: None,
            progress: Vec::new(),
        }
    }

    pub fn error(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            delay: None,
            progress: Vec::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fractions reported through the progress callback before returning.
    pub fn with_progress(mut self, fractions: &[f32]) -> Self {
        self.progress = fractions.to_vec();
        self
    }
}

/// A hand-rolled [`OcrEngine`]: a fixed response, or a sequence of responses
/// (one per call, repeating the last once exhausted).
pub struct MockOcr {
    responses: Mutex<Vec<MockOcrResponse>>,
    fallback: MockOcrResponse,
    call_count: AtomicUsize,
    running: Concurrency,
}

impl MockOcr {
    pub fn new(response: MockOcrResponse) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            fallback: response,
            call_count: AtomicUsize::new(0),
            running: Concurrency::default(),
        }
    }

    pub fn with_sequence(mut responses: Vec<MockOcrResponse>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one response"
        );
        responses.reverse();
        let fallback = responses.first().cloned().unwrap();
        Self {
            responses: Mutex::new(responses),
            fallback,
            call_count: AtomicUsize::new(0),
            running: Concurrency::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.running.max()
    }

    fn next_response(&self) -> MockOcrResponse {
        let mut seq = self.responses.lock().unwrap();
        seq.pop().unwrap_or_else(|| self.fallback.clone())
    }
}

impl OcrEngine for MockOcr {
    fn recognize<'a>(
        &'a self,
        _image: &'a RasterImage,
        on_progress: &'a (dyn Fn(f32) + Send + Sync),
    ) -> BoxFuture<'a, Result<String, BackendError>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let response = self.next_response();

        Box::pin(async move {
            let _in_flight = self.running.enter();
            for fraction in &response.progress {
                on_progress(*fraction);
            }
            if let Some(d) = response.delay {
                tokio::time::sleep(d).await;
            }
            response.result.map_err(BackendError::Ocr)
        })
    }
}

/// A hand-rolled [`DocxConverter`].
pub struct MockConverter {
    result: Result<String, String>,
    call_count: AtomicUsize,
}

impl MockConverter {
    pub fn text(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl DocxConverter for MockConverter {
    fn extract_raw_text<'a>(
        &'a self,
        _bytes: &'a [u8],
    ) -> BoxFuture<'a, Result<String, BackendError>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let result = self.result.clone().map_err(BackendError::Convert);
        Box::pin(async move { result })
    }
}

/// Sink that records every event it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Stages in the order they were entered.
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = Vec::new();
        for event in self.events.lock().unwrap().iter() {
            if stages.last() != Some(&event.stage) {
                stages.push(event.stage);
            }
        }
        stages
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}
