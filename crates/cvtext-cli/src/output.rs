use std::io::Write;
use std::path::{Path, PathBuf};

use cvtext_ingest::{ProgressEvent, Stage};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

pub const NO_TEXT_MESSAGE: &str = "No text extracted (may be scanned/image PDF)";

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Extracted { chars: usize, text: String },
    /// Extraction succeeded but produced nothing but whitespace.
    Empty,
    /// Rejected before extraction, or extraction failed.
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub filename: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl FileReport {
    pub fn from_text(filename: &str, text: String) -> Self {
        let outcome = if text.trim().is_empty() {
            Outcome::Empty
        } else {
            Outcome::Extracted {
                chars: text.chars().count(),
                text,
            }
        };
        Self {
            filename: filename.to_string(),
            outcome,
        }
    }

    pub fn error(filename: &str, message: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            outcome: Outcome::Error {
                message: message.into(),
            },
        }
    }

    /// The line reported for a file that yielded no text, in the
    /// `{filename}: {message}` form used for every per-file problem.
    pub fn problem(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Extracted { .. } => None,
            Outcome::Empty => Some(format!("{}: {}", self.filename, NO_TEXT_MESSAGE)),
            Outcome::Error { message } if message.starts_with(&self.filename) => {
                Some(message.clone())
            }
            Outcome::Error { message } => Some(format!("{}: {}", self.filename, message)),
        }
    }
}

/// One-line spinner message for a progress event.
pub fn describe_progress(event: &ProgressEvent) -> String {
    match event.stage {
        Stage::Extracting | Stage::Ocr => format!(
            "[{} {:.0}%] {}",
            event.stage,
            event.fraction() * 100.0,
            event.message
        ),
        Stage::Loading | Stage::Complete => format!("[{}] {}", event.stage, event.message),
    }
}

/// Print an extracted file's text under a header.
pub fn print_text(w: &mut dyn Write, report: &FileReport, color: ColorMode) -> std::io::Result<()> {
    let Outcome::Extracted { text, .. } = &report.outcome else {
        return Ok(());
    };
    let header = format!("==> {} <==", report.filename);
    if color.enabled() {
        writeln!(w, "{}", header.bold().cyan())?;
    } else {
        writeln!(w, "{}", header)?;
    }
    writeln!(w, "{}", text.trim_end())?;
    writeln!(w)?;
    Ok(())
}

/// Print one JSON object per line.
pub fn print_json(w: &mut dyn Write, report: &FileReport) -> std::io::Result<()> {
    serde_json::to_writer(&mut *w, report)?;
    writeln!(w)?;
    Ok(())
}

/// Where `--output-dir` writes a file's text: `<dir>/<stem>.txt`.
pub fn text_file_path(dir: &Path, filename: &str) -> PathBuf {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| filename.to_string());
    dir.join(format!("{stem}.txt"))
}

/// Confirm a file written by `--output-dir`.
pub fn print_written(
    w: &mut dyn Write,
    report: &FileReport,
    path: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    let chars = match &report.outcome {
        Outcome::Extracted { chars, .. } => *chars,
        _ => 0,
    };
    if color.enabled() {
        writeln!(
            w,
            "{} -> {} ({} chars)",
            report.filename.bold(),
            path.display().green(),
            chars
        )?;
    } else {
        writeln!(w, "{} -> {} ({} chars)", report.filename, path.display(), chars)?;
    }
    Ok(())
}

/// Warn that scanned PDFs cannot fall back to OCR.
pub fn print_ocr_missing(w: &mut dyn Write, binary: &Path, color: ColorMode) -> std::io::Result<()> {
    let line = format!(
        "Warning: {} not found; scanned PDFs will fail OCR (install tesseract-ocr or pass --tesseract)",
        binary.display()
    );
    if color.enabled() {
        writeln!(w, "{}", line.yellow())
    } else {
        writeln!(w, "{}", line)
    }
}

/// Print the batch summary and every per-file problem.
pub fn print_summary(
    w: &mut dyn Write,
    reports: &[FileReport],
    color: ColorMode,
) -> std::io::Result<()> {
    let extracted = reports
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Extracted { .. }))
        .count();
    let problems: Vec<String> = reports.iter().filter_map(FileReport::problem).collect();

    let line = format!("Extracted text from {} of {} files", extracted, reports.len());
    if color.enabled() {
        if problems.is_empty() {
            writeln!(w, "{}", line.green())?;
        } else {
            writeln!(w, "{}", line.yellow())?;
        }
    } else {
        writeln!(w, "{}", line)?;
    }

    for problem in &problems {
        if color.enabled() {
            writeln!(w, "  {} {}", "-".red(), problem)?;
        } else {
            writeln!(w, "  - {}", problem)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut dyn Write) -> std::io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn whitespace_only_text_is_empty() {
        let report = FileReport::from_text("scan.pdf", "  \n\n ".into());
        assert_eq!(report.outcome, Outcome::Empty);
        assert_eq!(
            report.problem().unwrap(),
            "scan.pdf: No text extracted (may be scanned/image PDF)"
        );
    }

    #[test]
    fn errors_are_not_prefixed_twice() {
        let validation = FileReport::error(
            "big.pdf",
            "big.pdf: File too large (12.0MB, max 10MB)",
        );
        assert_eq!(
            validation.problem().unwrap(),
            "big.pdf: File too large (12.0MB, max 10MB)"
        );
        let failure = FileReport::error("cv.pdf", "Failed to parse PDF: cv.pdf (bad xref)");
        assert_eq!(
            failure.problem().unwrap(),
            "cv.pdf: Failed to parse PDF: cv.pdf (bad xref)"
        );
    }

    #[test]
    fn json_lines_are_tagged_by_status() {
        let out = render(|w| {
            print_json(w, &FileReport::from_text("cv.txt", "Rust".into()))?;
            print_json(w, &FileReport::error("x.xlsx", "Unsupported file type: x.xlsx"))
        });
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["status"], "extracted");
        assert_eq!(lines[0]["filename"], "cv.txt");
        assert_eq!(lines[0]["chars"], 4);
        assert_eq!(lines[0]["text"], "Rust");
        assert_eq!(lines[1]["status"], "error");
        assert_eq!(lines[1]["message"], "Unsupported file type: x.xlsx");
    }

    #[test]
    fn progress_lines() {
        let event = ProgressEvent {
            stage: Stage::Ocr,
            current: 1.25,
            total: 3,
            message: "OCR page 2 of 3 (25%)".into(),
        };
        assert_eq!(describe_progress(&event), "[ocr 42%] OCR page 2 of 3 (25%)");

        let event = ProgressEvent {
            stage: Stage::Loading,
            current: 0.0,
            total: 100,
            message: "Loading PDF...".into(),
        };
        assert_eq!(describe_progress(&event), "[loading] Loading PDF...");
    }

    #[test]
    fn summary_lists_problems() {
        let reports = vec![
            FileReport::from_text("a.txt", "text".into()),
            FileReport::from_text("b.pdf", String::new()),
        ];
        let out = render(|w| print_summary(w, &reports, ColorMode(false)));
        assert_eq!(
            out,
            "Extracted text from 1 of 2 files\n  - b.pdf: No text extracted (may be scanned/image PDF)\n"
        );
    }

    #[test]
    fn output_file_replaces_extension() {
        let dir = Path::new("/tmp/out");
        assert_eq!(
            text_file_path(dir, "Jane_Smith.PDF"),
            PathBuf::from("/tmp/out/Jane_Smith.txt")
        );
        assert_eq!(
            text_file_path(dir, "notes.txt"),
            PathBuf::from("/tmp/out/notes.txt")
        );
    }

    #[test]
    fn ocr_warning_names_binary() {
        let out = render(|w| {
            print_ocr_missing(w, Path::new("/opt/bin/tesseract"), ColorMode(false))
        });
        assert_eq!(
            out,
            "Warning: /opt/bin/tesseract not found; scanned PDFs will fail OCR (install tesseract-ocr or pass --tesseract)\n"
        );
    }

    #[test]
    fn text_printed_under_header() {
        let report = FileReport::from_text("a.txt", "Jane\nSmith\n".into());
        let out = render(|w| print_text(w, &report, ColorMode(false)));
        assert_eq!(out, "==> a.txt <==\nJane\nSmith\n\n");
    }
}
