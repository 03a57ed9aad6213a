//! OCR through the `tesseract` command-line tool.
//!
//! Each page image is written to a temporary PNG and recognized by a separate
//! `tesseract <image> stdout` process, so no OCR state is shared between pages
//! or requests.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use cvtext_core::{BackendError, BoxFuture, ExtractionConfig, OcrEngine, RasterImage};

/// [`OcrEngine`] backed by the tesseract CLI.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
    page_segmentation_mode: u8,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            page_segmentation_mode: 1,
        }
    }
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            language: config.ocr_language.clone(),
            page_segmentation_mode: config.page_segmentation_mode,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Whether the configured binary can be executed at all.
    pub async fn is_available(&self) -> bool {
        let found = Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok();
        if !found {
            tracing::debug!(
                binary = %self.binary.display(),
                "tesseract not found - install tesseract-ocr for OCR support"
            );
        }
        found
    }

    /// Arguments for recognizing `image`, with output to stdout.
    fn build_args(&self, image: &Path) -> Vec<OsString> {
        vec![
            image.as_os_str().to_owned(),
            "stdout".into(),
            "-l".into(),
            self.language.clone().into(),
            "--psm".into(),
            self.page_segmentation_mode.to_string().into(),
        ]
    }

    async fn run(&self, image: &RasterImage) -> Result<String, BackendError> {
        let file = tempfile::Builder::new()
            .prefix("cvtext-ocr-")
            .suffix(".png")
            .tempfile()?;
        tokio::fs::write(file.path(), &image.png).await?;

        let output = Command::new(&self.binary)
            .args(self.build_args(file.path()))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                BackendError::Ocr(format!(
                    "failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize<'a>(
        &'a self,
        image: &'a RasterImage,
        on_progress: &'a (dyn Fn(f32) + Send + Sync),
    ) -> BoxFuture<'a, Result<String, BackendError>> {
        Box::pin(async move {
            // The CLI reports no intermediate progress.
            on_progress(0.0);
            let text = self.run(image).await?;
            tracing::debug!(
                width = image.width,
                height = image.height,
                chars = text.len(),
                language = %self.language,
                "tesseract finished"
            );
            on_progress(1.0);
            Ok(text)
        })
    }
}
