use std::path::PathBuf;

use cvtext_core::ConfigFile;
use cvtext_ingest::ExtractionConfig;

/// Values given on the command line; each wins over env and config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub lang: Option<String>,
    pub ocr_scale: Option<f32>,
    pub min_text_chars: Option<usize>,
    pub tesseract: Option<PathBuf>,
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
pub fn resolve(
    file: &ConfigFile,
    env: impl Fn(&str) -> Option<String>,
    overrides: &Overrides,
) -> ExtractionConfig {
    let mut config = ExtractionConfig::from_file(file);

    let parsed = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = parsed("CVTEXT_MIN_TEXT_CHARS").and_then(|v| v.trim().parse().ok()) {
        config.min_text_chars = v;
    }
    if let Some(v) = parsed("CVTEXT_OCR_SCALE")
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|s| *s > 0.0)
    {
        config.ocr_scale = v;
    }
    if let Some(v) = parsed("CVTEXT_OCR_LANG") {
        config.ocr_language = v;
    }
    if let Some(v) = parsed("CVTEXT_TESSERACT_PATH") {
        config.tesseract_path = PathBuf::from(v);
    }
    if let Some(v) = parsed("CVTEXT_MAX_FILE_SIZE_MB").and_then(|v| v.trim().parse().ok()) {
        config.max_file_size_mb = v;
    }
    if let Some(v) = parsed("CVTEXT_MAX_BATCH").and_then(|v| v.trim().parse().ok()) {
        config.max_batch = v;
    }

    if let Some(lang) = &overrides.lang {
        config.ocr_language = lang.clone();
    }
    if let Some(scale) = overrides.ocr_scale
        && scale > 0.0
    {
        config.ocr_scale = scale;
    }
    if let Some(min) = overrides.min_text_chars {
        config.min_text_chars = min;
    }
    if let Some(path) = &overrides.tesseract {
        config.tesseract_path = path.clone();
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvtext_core::config_file::{ExtractionSection, OcrSection};
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_any_source() {
        let config = resolve(&ConfigFile::default(), |_| None, &Overrides::default());
        assert_eq!(config, ExtractionConfig::default());
    }

    #[test]
    fn flag_beats_env_beats_file() {
        let file = ConfigFile {
            extraction: Some(ExtractionSection {
                min_text_chars: Some(30),
            }),
            ocr: Some(OcrSection {
                language: Some("deu".into()),
                scale: Some(1.5),
                ..Default::default()
            }),
            ..Default::default()
        };
        let env = env_from(&[("CVTEXT_MIN_TEXT_CHARS", "40"), ("CVTEXT_OCR_LANG", "fra")]);
        let overrides = Overrides {
            min_text_chars: Some(60),
            ..Default::default()
        };

        let config = resolve(&file, env, &overrides);
        assert_eq!(config.min_text_chars, 60);
        assert_eq!(config.ocr_language, "fra");
        assert_eq!(config.ocr_scale, 1.5);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let env = env_from(&[
            ("CVTEXT_OCR_SCALE", "-2"),
            ("CVTEXT_MAX_BATCH", "many"),
            ("CVTEXT_OCR_LANG", "  "),
        ]);
        let config = resolve(&ConfigFile::default(), env, &Overrides::default());
        assert_eq!(config.ocr_scale, 2.0);
        assert_eq!(config.max_batch, 50);
        assert_eq!(config.ocr_language, "eng");
    }

    #[test]
    fn env_limits_apply() {
        let env = env_from(&[("CVTEXT_MAX_FILE_SIZE_MB", "25"), ("CVTEXT_MAX_BATCH", " 5 ")]);
        let config = resolve(&ConfigFile::default(), env, &Overrides::default());
        assert_eq!(config.max_file_size_mb, 25);
        assert_eq!(config.max_batch, 5);
    }
}
