//! # PDF Generation
//!
//! Renders a [`DocumentPlan`] to PDF bytes and writes them to disk
//! atomically.
//!
//! ## Rendering Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DocumentPlan                                                           │
//! │       │  one PagePlan per page                                          │
//! │       ▼                                                                 │
//! │  PageElement (custom genpdf element)                                    │
//! │       │  draws every planned line and barcode at its absolute           │
//! │       │  millimeter position; no flow layout involved                   │
//! │       ▼                                                                 │
//! │  PDF bytes ──► temp file in the target directory ──► rename to dest     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The rename-on-success output means a crash or error mid-render never
//! leaves a truncated PDF where the print job expects a finished one.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use genpdf::error::Error as GenError;
use genpdf::style::Style;
use genpdf::{render, Context, Element, Position, RenderResult, Size};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use labelpress_core::{plan_document, DocumentPlan, LabelLayout, LabelPlan, LabelRecord, PagePlan};

use crate::error::PdfResult;
use crate::fonts::FontLibrary;

// =============================================================================
// Generated Document Metadata
// =============================================================================

/// What a successful generation produced.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub path: PathBuf,
    pub pages: usize,
    pub labels: usize,
    pub generated_at: DateTime<Utc>,
}

/// Timestamped output file name, e.g. `labels_20260830_142501.pdf`.
///
/// The clock is a parameter so naming stays testable and the caller
/// controls the single non-deterministic input.
pub fn output_filename(now: DateTime<Utc>) -> String {
    format!("labels_{}.pdf", now.format("%Y%m%d_%H%M%S"))
}

// =============================================================================
// Page Element
// =============================================================================

/// Draws one planned page. All positions come from the plan; the element
/// never computes layout.
struct PageElement {
    labels: Vec<LabelPlan>,
}

impl PageElement {
    fn new(page: &PagePlan) -> Self {
        PageElement {
            labels: page.labels.clone(),
        }
    }
}

impl Element for PageElement {
    fn render(
        &mut self,
        context: &Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, GenError> {
        for label in &self.labels {
            for line in &label.lines {
                let mut style = Style::new().with_font_size(line.size_pt);
                if line.bold {
                    style = style.bold();
                }
                area.print_str(
                    &context.font_cache,
                    Position::new(line.x_mm, line.y_mm),
                    style,
                    &line.text,
                )?;
            }

            if let Some(barcode) = &label.barcode {
                // Alternating bar/space element widths, starting with a bar.
                // The line primitive has a fixed stroke, so each bar is
                // filled with overlapping vertical strokes.
                let mut x = barcode.x_mm;
                for (index, width) in barcode.code.elements.iter().enumerate() {
                    let width_mm = *width as f64 * barcode.module_width_mm;
                    if index % 2 == 0 {
                        for offset in bar_stroke_offsets(width_mm) {
                            area.draw_line(
                                vec![
                                    Position::new(x + offset, barcode.y_mm),
                                    Position::new(
                                        x + offset,
                                        barcode.y_mm + barcode.height_mm,
                                    ),
                                ],
                                Style::new(),
                            );
                        }
                    }
                    x += width_mm;
                }
            }
        }

        let mut result = RenderResult::default();
        result.size = area.size();
        Ok(result)
    }
}

/// The default stroke is about 0.35 mm (1 pt) wide; stepping stroke
/// centers this closely leaves no visible gap inside a bar.
const BAR_STROKE_STEP_MM: f64 = 0.2;

/// Stroke center offsets (from the bar's left edge) that fill a bar of
/// the given width with the fixed-stroke line primitive.
fn bar_stroke_offsets(width_mm: f64) -> Vec<f64> {
    let strokes = (width_mm / BAR_STROKE_STEP_MM).ceil().max(1.0) as usize;
    let step = width_mm / strokes as f64;
    (0..strokes).map(|i| (i as f64 + 0.5) * step).collect()
}

// =============================================================================
// PDF Generator
// =============================================================================

/// Plans and renders label documents.
pub struct PdfGenerator {
    fonts: FontLibrary,
}

impl PdfGenerator {
    pub fn new(fonts: FontLibrary) -> Self {
        PdfGenerator { fonts }
    }

    /// The glyph metrics used for planning.
    pub fn fonts(&self) -> &FontLibrary {
        &self.fonts
    }

    /// Plans the document for these records. Fails with a layout error
    /// before anything is rendered or written.
    pub fn plan(&self, records: &[LabelRecord], layout: &LabelLayout) -> PdfResult<DocumentPlan> {
        Ok(plan_document(records, layout, &self.fonts)?)
    }

    /// Renders a plan to PDF bytes.
    pub fn render_plan(&self, plan: &DocumentPlan) -> PdfResult<Vec<u8>> {
        let mut doc = genpdf::Document::new(self.fonts.family().clone());
        doc.set_title("labels");
        // Skips the XMP metadata stream, so the creation timestamp stays
        // the only run-dependent content in the output.
        doc.set_minimal_conformance();
        doc.set_paper_size(Size::new(plan.page_width_mm, plan.page_height_mm));

        for (index, page) in plan.pages.iter().enumerate() {
            if index > 0 {
                doc.push(genpdf::elements::PageBreak::new());
            }
            doc.push(PageElement::new(page));
        }

        let mut bytes = Vec::new();
        doc.render(&mut bytes)?;
        debug!(
            pages = plan.pages.len(),
            bytes = bytes.len(),
            "rendered document"
        );
        Ok(bytes)
    }

    /// Plans, renders and writes the document in one step.
    ///
    /// The file appears at `dest` only after the full render succeeded;
    /// any failure leaves the destination untouched.
    pub fn generate(
        &self,
        records: &[LabelRecord],
        layout: &LabelLayout,
        dest: &Path,
    ) -> PdfResult<GeneratedDocument> {
        let plan = self.plan(records, layout)?;
        let bytes = self.render_plan(&plan)?;
        write_atomically(&bytes, dest)?;

        let document = GeneratedDocument {
            path: dest.to_path_buf(),
            pages: plan.pages.len(),
            labels: plan.label_count,
            generated_at: Utc::now(),
        };
        info!(
            path = %document.path.display(),
            pages = document.pages,
            labels = document.labels,
            "wrote label document"
        );
        Ok(document)
    }
}

/// Writes via a temp file in the destination directory and renames into
/// place. Same-directory keeps the rename atomic on every sane filesystem.
fn write_atomically(bytes: &[u8], dest: &Path) -> PdfResult<()> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PdfError;
    use crate::fonts::tests::system_fonts;
    use chrono::TimeZone;
    use labelpress_core::LabelField;
    use std::collections::BTreeMap;

    fn record(sku: &str) -> LabelRecord {
        LabelRecord {
            sku: sku.to_string(),
            name: format!("Shirt {}", sku),
            price_cents: 2450,
            barcode: None,
            stock_qty: 1,
            size: Some("104".to_string()),
            composition: Some("cotton 95% elastane 5%".to_string()),
            manufacturer: None,
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_output_filename_is_deterministic_for_a_time() {
        let at = Utc.with_ymd_and_hms(2026, 8, 30, 14, 25, 1).unwrap();
        assert_eq!(output_filename(at), "labels_20260830_142501.pdf");
    }

    #[test]
    fn test_generate_writes_a_pdf() {
        let Some(fonts) = system_fonts() else {
            eprintln!("skipping: no system fonts");
            return;
        };
        let generator = PdfGenerator::new(fonts);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("labels.pdf");

        let records: Vec<LabelRecord> = (0..4).map(|i| record(&format!("S{}", i))).collect();
        let document = generator
            .generate(&records, &LabelLayout::default(), &dest)
            .unwrap();

        assert_eq!(document.labels, 4);
        assert_eq!(document.pages, 2); // 3 per page

        let bytes = std::fs::read(&dest).unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        // No stray temp files left behind.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_failed_plan_leaves_no_file() {
        let Some(fonts) = system_fonts() else {
            eprintln!("skipping: no system fonts");
            return;
        };
        let generator = PdfGenerator::new(fonts);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("labels.pdf");

        let mut layout = LabelLayout::default();
        for line in &mut layout.lines {
            if line.field == LabelField::Size {
                line.required = true;
            }
        }
        let mut bad = record("S1");
        bad.size = None;

        let err = generator.generate(&[bad], &layout, &dest).unwrap_err();
        assert!(matches!(err, PdfError::Layout(_)));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_bar_strokes_cover_the_bar() {
        for width in [0.1_f64, 0.35, 0.8, 1.6] {
            let offsets = bar_stroke_offsets(width);
            assert!(!offsets.is_empty());
            // Centers stay inside the bar and neighbouring strokes are
            // close enough for the default stroke width to overlap.
            assert!(offsets.iter().all(|o| *o > 0.0 && *o < width));
            for pair in offsets.windows(2) {
                assert!(pair[1] - pair[0] <= BAR_STROKE_STEP_MM + 1e-9);
            }
        }
    }

    /// Blanks `D:YYYYMMDDHHMMSS...` date strings so the one variable
    /// field in the container does not defeat the comparison.
    fn scrub_pdf_dates(mut bytes: Vec<u8>) -> Vec<u8> {
        let mut i = 0;
        while i + 1 < bytes.len() {
            if bytes[i] == b'D' && bytes[i + 1] == b':' {
                let mut j = i + 2;
                while j < bytes.len()
                    && (bytes[j].is_ascii_digit() || matches!(bytes[j], b'+' | b'-' | b'\'' | b'Z'))
                {
                    bytes[j] = b'0';
                    j += 1;
                }
                i = j;
            } else {
                i += 1;
            }
        }
        bytes
    }

    #[test]
    fn test_render_is_identical_apart_from_creation_date() {
        let Some(fonts) = system_fonts() else {
            eprintln!("skipping: no system fonts");
            return;
        };
        let generator = PdfGenerator::new(fonts);
        let records: Vec<LabelRecord> = (0..3).map(|i| record(&format!("S{}", i))).collect();
        let plan = generator.plan(&records, &LabelLayout::default()).unwrap();

        let first = scrub_pdf_dates(generator.render_plan(&plan).unwrap());
        let second = scrub_pdf_dates(generator.render_plan(&plan).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_accepts_empty_plan() {
        let Some(fonts) = system_fonts() else {
            eprintln!("skipping: no system fonts");
            return;
        };
        let generator = PdfGenerator::new(fonts);
        let plan = generator.plan(&[], &LabelLayout::default()).unwrap();
        let bytes = generator.render_plan(&plan).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
