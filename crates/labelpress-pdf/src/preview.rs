//! # Label Preview
//!
//! Renders a single label as its own one-page document so an operator can
//! sanity-check the layout before printing a batch. Turning the PDF into
//! pixels is delegated to a [`Rasterizer`]; the stock implementation
//! shells out to poppler's `pdftoppm`, and an embedding GUI can supply
//! its own.

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use labelpress_core::{LabelLayout, LabelRecord};

use crate::error::{PdfError, PdfResult};
use crate::generator::PdfGenerator;

/// Converts a rendered PDF page into an image for display.
pub trait Rasterizer {
    /// Rasterizes one page (0-based) to encoded image bytes.
    fn rasterize(&self, pdf: &[u8], page: usize) -> PdfResult<Vec<u8>>;
}

// =============================================================================
// Poppler Rasterizer
// =============================================================================

/// Rasterizes through the `pdftoppm` binary (poppler-utils), producing
/// PNG bytes. The binary is an external collaborator; a missing install
/// surfaces as a render error, never breaks PDF generation.
pub struct PdftoppmRasterizer {
    executable: PathBuf,
    dpi: u32,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        PdftoppmRasterizer {
            executable: PathBuf::from("pdftoppm"),
            dpi: 300,
        }
    }
}

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executable(mut self, executable: PathBuf) -> Self {
        self.executable = executable;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// True when the binary can be invoked on this host.
    pub fn is_available(&self) -> bool {
        Command::new(&self.executable)
            .arg("-v")
            .output()
            .is_ok()
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf: &[u8], page: usize) -> PdfResult<Vec<u8>> {
        let dir = tempfile::tempdir()?;
        let pdf_path = dir.path().join("preview.pdf");
        std::fs::write(&pdf_path, pdf)?;

        // pdftoppm pages are 1-based.
        let page_arg = (page + 1).to_string();
        let prefix = dir.path().join("page");
        let output = Command::new(&self.executable)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(&page_arg)
            .arg("-l")
            .arg(&page_arg)
            .arg(&pdf_path)
            .arg(&prefix)
            .output()
            .map_err(|e| {
                PdfError::Render(format!("cannot run {}: {}", self.executable.display(), e))
            })?;
        if !output.status.success() {
            return Err(PdfError::Render(format!(
                "{} failed: {}",
                self.executable.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // Output lands as page-<n>.png; the digit padding depends on the
        // source page count, so pick up whatever single file appeared.
        for entry in std::fs::read_dir(dir.path())? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                debug!(path = %path.display(), "rasterized preview page");
                return Ok(std::fs::read(&path)?);
            }
        }
        Err(PdfError::Render(format!(
            "{} produced no image for page {}",
            self.executable.display(),
            page + 1
        )))
    }
}

/// A layout cut down to exactly one label per page.
///
/// The label geometry is untouched; only the page shrinks to the label
/// width, so the preview shows precisely what one printed label will be.
pub fn preview_layout(layout: &LabelLayout) -> LabelLayout {
    let mut preview = layout.clone();
    preview.name = format!("{}-preview", layout.name);
    preview.page_width_mm = layout.label_width_mm;
    preview.labels_per_page = 1;
    preview
}

impl PdfGenerator {
    /// Renders one record as a single-label PDF.
    pub fn render_preview(&self, record: &LabelRecord, layout: &LabelLayout) -> PdfResult<Vec<u8>> {
        let layout = preview_layout(layout);
        let plan = self.plan(std::slice::from_ref(record), &layout)?;
        self.render_plan(&plan)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::tests::system_fonts;
    use std::collections::BTreeMap;

    #[test]
    fn test_preview_layout_is_single_label() {
        let layout = LabelLayout::default();
        let preview = preview_layout(&layout);

        assert_eq!(preview.labels_per_page, 1);
        assert_eq!(preview.page_width_mm, layout.label_width_mm);
        assert_eq!(preview.page_height_mm, layout.page_height_mm);
        assert!(preview.validate().is_ok());
    }

    #[test]
    fn test_rasterizer_rejects_garbage_input() {
        let rasterizer = PdftoppmRasterizer::new();
        if !rasterizer.is_available() {
            eprintln!("skipping: pdftoppm not installed");
            return;
        }
        let err = rasterizer.rasterize(b"not a pdf", 0).unwrap_err();
        assert!(matches!(err, PdfError::Render(_)));
    }

    #[test]
    fn test_preview_rasterizes_to_png() {
        let Some(fonts) = system_fonts() else {
            eprintln!("skipping: no system fonts");
            return;
        };
        let rasterizer = PdftoppmRasterizer::new().with_dpi(72);
        if !rasterizer.is_available() {
            eprintln!("skipping: pdftoppm not installed");
            return;
        }

        let record = LabelRecord {
            sku: "S1".to_string(),
            name: "Shirt S1".to_string(),
            price_cents: 2450,
            barcode: None,
            stock_qty: 1,
            size: Some("104".to_string()),
            composition: None,
            manufacturer: None,
            attributes: BTreeMap::new(),
        };
        let generator = PdfGenerator::new(fonts);
        let pdf = generator
            .render_preview(&record, &LabelLayout::default())
            .unwrap();

        let image = rasterizer.rasterize(&pdf, 0).unwrap();
        assert!(image.starts_with(b"\x89PNG\r\n\x1a\n"));
    }
}
