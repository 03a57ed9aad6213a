use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ExtractionConfig;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub extraction: Option<ExtractionSection>,
    pub ocr: Option<OcrSection>,
    pub limits: Option<LimitsSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSection {
    pub min_text_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrSection {
    pub scale: Option<f32>,
    pub language: Option<String>,
    pub tesseract_path: Option<String>,
    pub page_segmentation_mode: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitsSection {
    pub max_file_size_mb: Option<u64>,
    pub max_batch: Option<usize>,
}

impl From<&ExtractionConfig> for ConfigFile {
    fn from(config: &ExtractionConfig) -> Self {
        ConfigFile {
            extraction: Some(ExtractionSection {
                min_text_chars: Some(config.min_text_chars),
            }),
            ocr: Some(OcrSection {
                scale: Some(config.ocr_scale),
                language: Some(config.ocr_language.clone()),
                tesseract_path: Some(config.tesseract_path.display().to_string()),
                page_segmentation_mode: Some(config.page_segmentation_mode),
            }),
            limits: Some(LimitsSection {
                max_file_size_mb: Some(config.max_file_size_mb),
                max_batch: Some(config.max_batch),
            }),
        }
    }
}

/// Platform config directory path: `<config_dir>/cvtext/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cvtext").join("config.toml"))
}

/// Load config by cascading CWD `.cvtext.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".cvtext.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        extraction: Some(ExtractionSection {
            min_text_chars: overlay
                .extraction
                .as_ref()
                .and_then(|e| e.min_text_chars)
                .or_else(|| base.extraction.as_ref().and_then(|e| e.min_text_chars)),
        }),
        ocr: Some(OcrSection {
            scale: overlay
                .ocr
                .as_ref()
                .and_then(|o| o.scale)
                .or_else(|| base.ocr.as_ref().and_then(|o| o.scale)),
            language: overlay
                .ocr
                .as_ref()
                .and_then(|o| o.language.clone())
                .or_else(|| base.ocr.as_ref().and_then(|o| o.language.clone())),
            tesseract_path: overlay
                .ocr
                .as_ref()
                .and_then(|o| o.tesseract_path.clone())
                .or_else(|| base.ocr.as_ref().and_then(|o| o.tesseract_path.clone())),
            page_segmentation_mode: overlay
                .ocr
                .as_ref()
                .and_then(|o| o.page_segmentation_mode)
                .or_else(|| base.ocr.as_ref().and_then(|o| o.page_segmentation_mode)),
        }),
        limits: Some(LimitsSection {
            max_file_size_mb: overlay
                .limits
                .as_ref()
                .and_then(|l| l.max_file_size_mb)
                .or_else(|| base.limits.as_ref().and_then(|l| l.max_file_size_mb)),
            max_batch: overlay
                .limits
                .as_ref()
                .and_then(|l| l.max_batch)
                .or_else(|| base.limits.as_ref().and_then(|l| l.max_batch)),
        }),
    }
}

/// Save a config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    save_to_path(config, &path)?;
    Ok(path)
}

/// Save a config to `path`, creating parent directories as needed.
pub fn save_to_path(config: &ConfigFile, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_round_trip_toml() {
        let config = ConfigFile {
            ocr: Some(OcrSection {
                language: Some("eng+fra".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.ocr.unwrap().language.unwrap(), "eng+fra");
    }

    #[test]
    fn absent_fields_deserialize_as_none() {
        let toml_str = "[ocr]\nscale = 3.0\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        let ocr = parsed.ocr.unwrap();
        assert_eq!(ocr.scale, Some(3.0));
        assert!(ocr.language.is_none());
        assert!(parsed.extraction.is_none());
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            extraction: Some(ExtractionSection {
                min_text_chars: Some(40),
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            extraction: Some(ExtractionSection {
                min_text_chars: Some(60),
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        assert_eq!(merged.extraction.unwrap().min_text_chars, Some(60));
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            limits: Some(LimitsSection {
                max_file_size_mb: Some(25),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(merged.limits.unwrap().max_file_size_mb, Some(25));
    }

    #[test]
    fn defaults_survive_save_and_load() {
        let dir = std::env::temp_dir().join(format!("cvtext_config_test_{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");
        let written = ConfigFile::from(&ExtractionConfig::default());

        save_to_path(&written, &path).unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded, written);
        assert_eq!(ExtractionConfig::from_file(&loaded), ExtractionConfig::default());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unparsable_file_is_ignored() {
        let dir = std::env::temp_dir().join(format!("cvtext_bad_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[ocr\nscale = ").unwrap();
        assert!(load_from_path(&path).is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
