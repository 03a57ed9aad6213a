use std::borrow::Cow;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod engine;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod progress;
pub mod text_utils;

pub use backend::{
    BackendError, BoxFuture, DocxConverter, OcrEngine, PdfDocument, PdfLoader, RasterImage,
};
pub use config_file::ConfigFile;
pub use engine::PdfExtractor;
pub use progress::{ChannelSink, ProgressEvent, ProgressSink, Stage};

/// Where a file's bytes come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// An uploaded document: a name (with extension) plus its byte source.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    name: String,
    source: FileSource,
}

impl DocumentFile {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Bytes(bytes.into()),
        }
    }

    /// A file on disk; its name is the path's final component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            source: FileSource::Path(path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            FileSource::Path(p) => Some(p),
            FileSource::Bytes(_) => None,
        }
    }

    /// Size of the file in bytes.
    pub async fn byte_len(&self) -> std::io::Result<u64> {
        match &self.source {
            FileSource::Bytes(b) => Ok(b.len() as u64),
            FileSource::Path(p) => Ok(tokio::fs::metadata(p).await?.len()),
        }
    }

    /// The file's content, read with a single awaitable read when on disk.
    pub async fn read_bytes(&self) -> std::io::Result<Cow<'_, [u8]>> {
        match &self.source {
            FileSource::Bytes(b) => Ok(Cow::Borrowed(b.as_slice())),
            FileSource::Path(p) => Ok(Cow::Owned(tokio::fs::read(p).await?)),
        }
    }
}

/// Text read from one page during the text-layer pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    /// 1-based.
    pub page_index: usize,
    pub text: String,
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported file type: {filename}")]
    UnsupportedFormat { filename: String },
    #[error("Failed to read file: {filename} ({cause})")]
    ReadFailure {
        filename: String,
        #[source]
        cause: BackendError,
    },
    #[error("Failed to parse PDF: {filename} ({cause})")]
    PdfParseFailure {
        filename: String,
        #[source]
        cause: BackendError,
    },
}

impl ExtractionError {
    /// The file the error is attributed to.
    pub fn filename(&self) -> &str {
        match self {
            ExtractionError::UnsupportedFormat { filename }
            | ExtractionError::ReadFailure { filename, .. }
            | ExtractionError::PdfParseFailure { filename, .. } => filename,
        }
    }
}

/// Default OCR fallback threshold, in characters.
pub const DEFAULT_MIN_TEXT_CHARS: usize = 50;
/// Default rasterization scale for OCR.
pub const DEFAULT_OCR_SCALE: f32 = 2.0;

/// Configuration for extraction and its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    /// The text layer is kept only when it holds more than this many characters.
    pub min_text_chars: usize,
    pub ocr_scale: f32,
    pub ocr_language: String,
    pub tesseract_path: PathBuf,
    pub page_segmentation_mode: u8,
    /// Per-file upload limit enforced by batch front ends.
    pub max_file_size_mb: u64,
    /// Maximum files per batch enforced by batch front ends.
    pub max_batch: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            ocr_scale: DEFAULT_OCR_SCALE,
            ocr_language: "eng".to_string(),
            tesseract_path: PathBuf::from("tesseract"),
            page_segmentation_mode: 1,
            max_file_size_mb: 10,
            max_batch: 50,
        }
    }
}

impl ExtractionConfig {
    /// Defaults overlaid with whatever the config file sets.
    pub fn from_file(file: &ConfigFile) -> Self {
        let mut config = Self::default();
        if let Some(extraction) = &file.extraction
            && let Some(min) = extraction.min_text_chars
        {
            config.min_text_chars = min;
        }
        if let Some(ocr) = &file.ocr {
            if let Some(scale) = ocr.scale
                && scale > 0.0
            {
                config.ocr_scale = scale;
            }
            if let Some(lang) = &ocr.language {
                config.ocr_language = lang.clone();
            }
            if let Some(path) = &ocr.tesseract_path {
                config.tesseract_path = PathBuf::from(path);
            }
            if let Some(psm) = ocr.page_segmentation_mode {
                config.page_segmentation_mode = psm;
            }
        }
        if let Some(limits) = &file.limits {
            if let Some(mb) = limits.max_file_size_mb {
                config.max_file_size_mb = mb;
            }
            if let Some(n) = limits.max_batch {
                config.max_batch = n;
            }
        }
        config
    }
}
