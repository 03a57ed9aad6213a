//! One-way progress reporting for PDF extraction.
//!
//! A request moves through `loading → extracting → complete` when the text
//! layer is usable, or `loading → extracting → ocr → complete` when it falls
//! back to OCR. No other sequence is valid.

use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;

/// Stage of a single extraction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Loading,
    Extracting,
    Ocr,
    Complete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Loading => "loading",
            Stage::Extracting => "extracting",
            Stage::Ocr => "ocr",
            Stage::Complete => "complete",
        }
    }

    /// Whether a request currently in `prev` (or not yet started, `None`) may
    /// move to `self`.
    pub fn can_follow(self, prev: Option<Stage>) -> bool {
        matches!(
            (prev, self),
            (None, Stage::Loading)
                | (Some(Stage::Loading), Stage::Extracting)
                | (Some(Stage::Extracting), Stage::Ocr)
                | (Some(Stage::Extracting), Stage::Complete)
                | (Some(Stage::Ocr), Stage::Complete)
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A progress update. `current` is fractional so OCR can advance within a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub current: f64,
    pub total: usize,
    pub message: String,
}

impl ProgressEvent {
    /// Completion ratio in `0.0..=1.0`; a zero total counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.current / self.total as f64).clamp(0.0, 1.0)
        }
    }
}

/// Receiver of progress events. Implementations must not block for long: the
/// pipeline calls `emit` inline.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that forwards events over an unbounded channel, so a slow observer
/// drains them on its own schedule without holding up extraction.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        // Receiver gone means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

/// Create a channel-backed sink and its receiving end.
pub fn channel() -> (ChannelSink, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}

#[derive(Debug, Default)]
struct ReporterState {
    stage: Option<Stage>,
    high_water: f64,
}

/// Per-request wrapper around an optional sink that enforces the stage
/// machine and keeps OCR progress monotonic.
pub(crate) struct ProgressReporter<'a> {
    sink: Option<&'a dyn ProgressSink>,
    state: Mutex<ReporterState>,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(sink: Option<&'a dyn ProgressSink>) -> Self {
        Self {
            sink,
            state: Mutex::new(ReporterState::default()),
        }
    }

    /// Move to `stage` and emit its opening event.
    pub(crate) fn enter(&self, stage: Stage, current: f64, total: usize, message: String) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            debug_assert!(
                stage.can_follow(state.stage),
                "illegal progress transition {:?} -> {:?}",
                state.stage,
                stage
            );
            state.stage = Some(stage);
            state.high_water = current;
        }
        tracing::trace!(stage = stage.as_str(), current, total, "stage entered");
        self.send(stage, current, total, message);
    }

    /// Emit an update within the current stage. `current` never moves
    /// backwards during OCR.
    pub(crate) fn report(&self, current: f64, total: usize, message: String) {
        let (stage, current) = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let Some(stage) = state.stage else {
                debug_assert!(false, "progress reported before any stage was entered");
                return;
            };
            let current = if stage == Stage::Ocr {
                current.max(state.high_water)
            } else {
                current
            };
            state.high_water = state.high_water.max(current);
            (stage, current.min(total as f64))
        };
        self.send(stage, current, total, message);
    }

    pub(crate) fn stage(&self) -> Option<Stage> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).stage
    }

    fn send(&self, stage: Stage, current: f64, total: usize, message: String) {
        if let Some(sink) = self.sink {
            sink.emit(ProgressEvent {
                stage,
                current,
                total,
                message,
            });
        }
    }
}
