//! # Font Loading
//!
//! Finds and loads a TTF family for label text, and exposes real glyph
//! metrics through the [`TextMeasure`] trait so the planner wraps text
//! against the same widths the renderer will draw.
//!
//! ## Search Order
//! ```text
//! 1. The configured font directory (settings.json)
//! 2. ./fonts next to the executable's working directory
//! 3. /usr/share/fonts/truetype/dejavu (stock Linux install)
//! ```
//!
//! ## Face Discovery
//! Families in the wild are inconsistent about suffixes: DejaVu ships
//! `DejaVuSans.ttf` + `DejaVuSans-Bold.ttf` + `DejaVuSans-Oblique.ttf`,
//! others use `-Regular` and `-Italic`. Each face tries its suffix
//! variants and falls back to a plainer face rather than failing, so a
//! family with only a regular weight still renders (without bold).

use std::path::{Path, PathBuf};

use genpdf::fonts::{FontCache, FontData, FontFamily};
use genpdf::style::Style;
use tracing::debug;

use labelpress_core::TextMeasure;

use crate::error::{PdfError, PdfResult};

/// Default family name; matches a stock Linux DejaVu install.
pub const DEFAULT_FONT_NAME: &str = "DejaVuSans";

const SYSTEM_FONT_DIR: &str = "/usr/share/fonts/truetype/dejavu";

// =============================================================================
// Font Library
// =============================================================================

/// A loaded font family plus a metrics cache.
///
/// Create once per run; cloning the family for the document is cheap
/// relative to parsing the TTFs.
pub struct FontLibrary {
    family: FontFamily<FontData>,
    cache: FontCache,
}

impl FontLibrary {
    /// Loads `name` from the first search directory that has it.
    pub fn load(extra_dir: Option<&Path>, name: &str) -> PdfResult<Self> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        if let Some(dir) = extra_dir {
            dirs.push(dir.to_path_buf());
        }
        dirs.push(PathBuf::from("fonts"));
        dirs.push(PathBuf::from(SYSTEM_FONT_DIR));

        for dir in &dirs {
            if let Some(library) = Self::load_from_dir(dir, name)? {
                debug!(dir = %dir.display(), name, "loaded font family");
                return Ok(library);
            }
        }

        Err(PdfError::Font(format!(
            "font family '{}' not found in {}",
            name,
            dirs.iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    /// Tries one directory. `Ok(None)` means the regular face is absent
    /// there; a present but unparsable file is a hard error.
    fn load_from_dir(dir: &Path, name: &str) -> PdfResult<Option<Self>> {
        let Some(regular) = read_face(dir, name, &["", "-Regular"])? else {
            return Ok(None);
        };
        let bold = read_face(dir, name, &["-Bold"])?.unwrap_or_else(|| regular.clone());
        let italic =
            read_face(dir, name, &["-Oblique", "-Italic"])?.unwrap_or_else(|| regular.clone());
        let bold_italic = read_face(dir, name, &["-BoldOblique", "-BoldItalic"])?
            .unwrap_or_else(|| bold.clone());

        let family = FontFamily {
            regular,
            bold,
            italic,
            bold_italic,
        };
        let cache = FontCache::new(family.clone());
        Ok(Some(FontLibrary { family, cache }))
    }

    /// The family for building a document.
    pub fn family(&self) -> &FontFamily<FontData> {
        &self.family
    }

    pub fn cache(&self) -> &FontCache {
        &self.cache
    }
}

// Neither the family nor the cache carries a useful Debug form.
impl std::fmt::Debug for FontLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontLibrary").finish_non_exhaustive()
    }
}

fn read_face(dir: &Path, name: &str, suffixes: &[&str]) -> PdfResult<Option<FontData>> {
    for suffix in suffixes {
        let path = dir.join(format!("{}{}.ttf", name, suffix));
        if !path.is_file() {
            continue;
        }
        let bytes = std::fs::read(&path)?;
        let data = FontData::new(bytes, None)
            .map_err(|e| PdfError::Font(format!("{}: {}", path.display(), e)))?;
        return Ok(Some(data));
    }
    Ok(None)
}

// =============================================================================
// Glyph Metrics
// =============================================================================

impl TextMeasure for FontLibrary {
    fn width_mm(&self, text: &str, size_pt: u8, bold: bool) -> f64 {
        let mut style = Style::new().with_font_size(size_pt);
        if bold {
            style = style.bold();
        }
        f64::from(style.str_width(&self.cache, text))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Loads the system DejaVu family, or None on hosts without it.
    /// Metric-dependent tests skip in that case rather than fail.
    pub(crate) fn system_fonts() -> Option<FontLibrary> {
        FontLibrary::load(None, DEFAULT_FONT_NAME).ok()
    }

    #[test]
    fn test_missing_family_reports_search_dirs() {
        let err = FontLibrary::load(None, "NoSuchFamily").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("NoSuchFamily"));
        assert!(message.contains(SYSTEM_FONT_DIR));
    }

    #[test]
    fn test_measured_width_scales() {
        let Some(fonts) = system_fonts() else {
            eprintln!("skipping: no system fonts");
            return;
        };

        let narrow = fonts.width_mm("il", 6, false);
        let wide = fonts.width_mm("WM", 6, false);
        assert!(narrow > 0.0);
        assert!(wide > narrow);

        let small = fonts.width_mm("Sample", 6, false);
        let large = fonts.width_mm("Sample", 12, false);
        assert!(large > small);
    }
}
