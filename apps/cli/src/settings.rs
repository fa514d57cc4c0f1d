//! Application settings: label layout, output location, fonts.
//!
//! Unlike the database config, every setting here has a sensible default,
//! so a missing settings file just means "print the stock label". A file
//! that exists but does not parse is an error; silently ignoring a typo'd
//! layout would print a few hundred wrong labels.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use labelpress_core::LabelLayout;
use labelpress_pdf::DEFAULT_FONT_NAME;

fn default_output_dir() -> PathBuf {
    PathBuf::from("labels")
}

fn default_font_name() -> String {
    DEFAULT_FONT_NAME.to_string()
}

/// Settings file contents (`settings.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Label layout; omitted fields fall back to the stock layout.
    #[serde(default)]
    pub layout: LabelLayout,

    /// Where timestamped output files land.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Print one label per unit in stock by default.
    #[serde(default)]
    pub use_stock_quantity: bool,

    /// Also write a single-label preview next to each generated document.
    #[serde(default)]
    pub preview_enabled: bool,

    /// Extra font search directory, tried before the system locations.
    #[serde(default)]
    pub font_dir: Option<PathBuf>,

    /// Font family name, e.g. "DejaVuSans".
    #[serde(default = "default_font_name")]
    pub font_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            layout: LabelLayout::default(),
            output_dir: default_output_dir(),
            use_stock_quantity: false,
            preview_enabled: false,
            font_dir: None,
            font_name: default_font_name(),
        }
    }
}

impl Settings {
    /// Loads settings, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "settings file not found, using defaults");
            return Ok(Settings::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        settings
            .layout
            .validate()
            .with_context(|| format!("invalid layout in {}", path.display()))?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("labels"));
        assert_eq!(settings.font_name, "DejaVuSans");
        assert!(!settings.use_stock_quantity);
    }

    #[test]
    fn test_partial_file_keeps_layout_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"output_dir": "/tmp/out"}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(settings.layout, LabelLayout::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(Settings::load(&path).is_err());
    }
}
