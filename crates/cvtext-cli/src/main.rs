use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use cvtext_core::{ConfigFile, config_file};
use cvtext_ingest::{
    DocumentFile, DocumentFormat, ExtractionConfig, ProgressEvent, TesseractEngine, TextExtractor,
};

mod config;
mod output;
mod validate;

use config::Overrides;
use output::{ColorMode, FileReport, Outcome};

/// Résumé text extractor - pull plain text out of PDF, DOCX and TXT résumés,
/// falling back to OCR for scanned PDFs
#[derive(Parser, Debug)]
#[command(name = "cvtext", version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr (otherwise RUST_LOG, default warn)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract text from one or more résumé files (PDF, DOCX, DOC, TXT)
    Extract {
        /// Files to extract, processed one at a time in the given order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write each file's text to <DIR>/<stem>.txt instead of stdout
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Print one JSON object per file
        #[arg(long, conflicts_with = "output_dir")]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Tesseract language(s) for OCR, e.g. eng or eng+deu
        #[arg(long)]
        lang: Option<String>,

        /// Rasterization scale for OCR
        #[arg(long)]
        ocr_scale: Option<f32>,

        /// Keep the PDF text layer only above this many characters
        #[arg(long)]
        min_text_chars: Option<usize>,

        /// Path to the tesseract binary
        #[arg(long)]
        tesseract: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Also save it to the platform config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Extract {
            files,
            output_dir,
            json,
            no_color,
            lang,
            ocr_scale,
            min_text_chars,
            tesseract,
        } => {
            let overrides = Overrides {
                lang,
                ocr_scale,
                min_text_chars,
                tesseract,
            };
            let config = config::resolve(&config_file::load_config(), env_var, &overrides);
            extract(files, output_dir, json, no_color, config).await
        }
        Command::Config { save } => show_config(save),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

async fn extract(
    files: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    json: bool,
    no_color: bool,
    config: ExtractionConfig,
) -> anyhow::Result<()> {
    validate::check_batch(files.len(), config.max_batch).map_err(anyhow::Error::msg)?;

    if let Some(dir) = &output_dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    let color = ColorMode(!no_color && !json);
    let mut writer: Box<dyn Write> = Box::new(std::io::stdout());

    tracing::debug!(
        files = files.len(),
        min_text_chars = config.min_text_chars,
        ocr_scale = config.ocr_scale,
        language = %config.ocr_language,
        "starting extraction"
    );
    let extractor = TextExtractor::from_config(&config);

    let has_pdf = files.iter().any(|path| {
        DocumentFormat::from_filename(DocumentFile::from_path(path).name())
            == Some(DocumentFormat::Pdf)
    });
    if has_pdf {
        let ocr = TesseractEngine::from_config(&config);
        if !ocr.is_available().await {
            output::print_ocr_missing(&mut std::io::stderr(), ocr.binary(), color)?;
        }
    }

    let spinner_style = ProgressStyle::with_template("{spinner:.green} {prefix} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let total = files.len();
    let mut reports = Vec::with_capacity(total);
    for (i, path) in files.iter().enumerate() {
        let file = DocumentFile::from_path(path);
        let size = file.byte_len().await.ok();

        let report = match validate::check_file(file.name(), size, config.max_file_size_mb) {
            Err(message) => FileReport::error(file.name(), message),
            Ok(()) => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(spinner_style.clone());
                bar.set_prefix(format!("[{}/{}] {}", i + 1, total, file.name()));
                bar.enable_steady_tick(Duration::from_millis(120));

                let sink = {
                    let bar = bar.clone();
                    move |event: ProgressEvent| bar.set_message(output::describe_progress(&event))
                };
                let result = extractor.extract_text(&file, Some(&sink)).await;
                bar.finish_and_clear();

                match result {
                    Ok(text) => FileReport::from_text(file.name(), text),
                    Err(e) => FileReport::error(file.name(), e.to_string()),
                }
            }
        };

        emit(&mut *writer, &report, output_dir.as_deref(), json, color)?;
        reports.push(report);
    }
    writer.flush()?;

    output::print_summary(&mut std::io::stderr(), &reports, color)?;

    let failed = reports.iter().filter(|r| r.problem().is_some()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} files produced no text", failed, total);
    }
    Ok(())
}

fn emit(
    w: &mut dyn Write,
    report: &FileReport,
    output_dir: Option<&Path>,
    json: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    if json {
        output::print_json(w, report)?;
        return Ok(());
    }
    match (output_dir, &report.outcome) {
        (Some(dir), Outcome::Extracted { text, .. }) => {
            let path = output::text_file_path(dir, &report.filename);
            std::fs::write(&path, text)?;
            output::print_written(w, report, &path, color)?;
        }
        (Some(_), _) => {}
        (None, _) => output::print_text(w, report, color)?,
    }
    Ok(())
}

fn show_config(save: bool) -> anyhow::Result<()> {
    let config = config::resolve(&config_file::load_config(), env_var, &Overrides::default());
    let file = ConfigFile::from(&config);
    print!("{}", toml::to_string_pretty(&file)?);

    if save {
        let path = config_file::save_config(&file).map_err(anyhow::Error::msg)?;
        eprintln!("Saved configuration to {}", path.display());
    }
    Ok(())
}
