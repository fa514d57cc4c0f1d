//! # Document Planning
//!
//! Deterministically turns records + layout into a fully positioned
//! [`DocumentPlan`]. The PDF backend only draws what the plan says; every
//! decision (wrapping, line heights, grid position, page breaks, barcode
//! geometry) is made here, in pure code.
//!
//! ## Planning Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  records + layout                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate ──► LayoutError (fail fast, nothing rendered)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  per record: resolve lines ──► wrap text ──► distribute line heights    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  grid placement: labels left→right, page break when the row is full     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DocumentPlan (positions in mm, from the page's top-left corner)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Determinism is a contract: identical inputs always produce an identical
//! plan. The generation timestamp lives in document *metadata*, never in
//! the plan.

use crate::barcode::{self, Code128};
use crate::error::{LayoutError, PlanResult};
use crate::layout::{Align, LabelField, LabelLayout, LineSpec};
use crate::measure::TextMeasure;
use crate::record::LabelRecord;

// =============================================================================
// Geometry Constants
// =============================================================================

/// Extra gap inserted above the price line, millimeters.
const PRICE_GAP_MM: f64 = 3.0;

/// Left/right padding around the barcode inside the label, millimeters.
const BARCODE_SIDE_PAD_MM: f64 = 2.0;

/// Vertical gap reserved between text and barcode, millimeters.
const BARCODE_GAP_MM: f64 = 2.0;

/// Text never gets squeezed below this much vertical space, millimeters.
const MIN_TEXT_SPACE_MM: f64 = 5.0;

// =============================================================================
// Plan Types
// =============================================================================

/// One positioned line of text. Coordinates are absolute on the page,
/// in millimeters, measured from the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub text: String,
    pub x_mm: f64,
    pub y_mm: f64,
    pub bold: bool,
    pub size_pt: u8,
}

/// A positioned Code 128 barcode.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedBarcode {
    /// Encoded element widths (modules), starting with a bar.
    pub code: Code128,
    /// Payload, kept for diagnostics.
    pub value: String,
    pub x_mm: f64,
    pub y_mm: f64,
    pub module_width_mm: f64,
    pub height_mm: f64,
}

/// Everything drawn for a single label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlan {
    pub sku: String,
    pub lines: Vec<PlannedLine>,
    pub barcode: Option<PlannedBarcode>,
}

/// One page of labels.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub labels: Vec<LabelPlan>,
}

/// A fully planned document, ready for the rendering backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPlan {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub pages: Vec<PagePlan>,
    pub label_count: usize,
}

// =============================================================================
// Planning
// =============================================================================

/// Plans a document: validates, wraps, positions and paginates.
///
/// ## Guarantees
/// - Fails with [`LayoutError`] before producing *any* plan when a record
///   cannot satisfy the layout (required field missing, barcode not
///   encodable) — no partial documents.
/// - Preserves record order: label `i` is at grid slot `i % labels_per_page`
///   of page `i / labels_per_page`.
/// - Deterministic for identical inputs.
pub fn plan_document<M: TextMeasure>(
    records: &[LabelRecord],
    layout: &LabelLayout,
    measure: &M,
) -> PlanResult<DocumentPlan> {
    layout.validate()?;

    // Validate every record up front so nothing is planned for a batch
    // that will fail halfway through.
    let mut barcodes: Vec<Option<Code128>> = Vec::with_capacity(records.len());
    for record in records {
        validate_record(record, layout)?;
        if layout.barcode {
            let value = record.barcode_value();
            let code = barcode::encode(value).ok_or_else(|| LayoutError::Barcode {
                sku: record.sku.clone(),
                value: value.to_string(),
            })?;
            barcodes.push(Some(code));
        } else {
            barcodes.push(None);
        }
    }

    let per_page = layout.labels_per_page as usize;
    let mut pages: Vec<PagePlan> = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let column = index % per_page;
        if column == 0 {
            pages.push(PagePlan { labels: Vec::new() });
        }

        let barcode = barcodes[index].clone();
        let label = plan_label(record, barcode, column, layout, measure);
        // A page was pushed above whenever column wrapped to 0.
        if let Some(page) = pages.last_mut() {
            page.labels.push(label);
        }
    }

    Ok(DocumentPlan {
        page_width_mm: layout.page_width_mm,
        page_height_mm: layout.page_height_mm,
        pages,
        label_count: records.len(),
    })
}

/// Checks the non-null constraints the layout imposes on one record.
fn validate_record(record: &LabelRecord, layout: &LabelLayout) -> PlanResult<()> {
    for line in &layout.lines {
        if !line.required || line.field == LabelField::Static {
            continue;
        }
        if record.field_value(&line.field, line.key.as_deref()).is_none() {
            let field = match (&line.field, &line.key) {
                (LabelField::Attribute, Some(key)) => key.clone(),
                _ => line.field.name().to_string(),
            };
            return Err(LayoutError::MissingValue {
                sku: record.sku.clone(),
                field,
            });
        }
    }
    Ok(())
}

/// Resolved, wrapped line awaiting vertical placement.
struct FlatLine {
    text: String,
    bold: bool,
    align: Align,
    size_pt: u8,
    /// First wrapped fragment of the price line gets the extra gap.
    price_lead: bool,
}

fn resolve_line(record: &LabelRecord, spec: &LineSpec) -> Option<String> {
    let value = match spec.field {
        LabelField::Static => spec.text.clone()?,
        _ => record.field_value(&spec.field, spec.key.as_deref())?,
    };
    match &spec.prefix {
        Some(prefix) => Some(format!("{}{}", prefix, value)),
        None => Some(value),
    }
}

/// Plans a single label at grid column `column`.
fn plan_label<M: TextMeasure>(
    record: &LabelRecord,
    barcode: Option<Code128>,
    column: usize,
    layout: &LabelLayout,
    measure: &M,
) -> LabelPlan {
    let x0 = column as f64 * layout.label_width_mm;
    let text_width = layout.text_width_mm();

    // Resolve and wrap all lines first; line height depends on the total
    // wrapped count.
    let mut flat: Vec<FlatLine> = Vec::new();
    for spec in &layout.lines {
        let Some(text) = resolve_line(record, spec) else {
            // Optional line with no value: skipped, not an error.
            continue;
        };
        let is_price = spec.field == LabelField::Price;
        let size_pt = if is_price {
            layout.price_font_size
        } else {
            layout.font_size
        };
        let wrapped = wrap_text(&text, text_width, size_pt, spec.bold, measure);
        for (i, fragment) in wrapped.into_iter().enumerate() {
            flat.push(FlatLine {
                text: fragment,
                bold: spec.bold,
                align: spec.align,
                size_pt,
                price_lead: is_price && i == 0,
            });
        }
    }

    // Vertical budget: page height minus margins minus space physically
    // taken by the barcode, clamped so text never collapses entirely.
    let mut reserved = 0.0;
    if barcode.is_some() {
        reserved += layout.barcode_height_mm + BARCODE_GAP_MM;
    }
    let mut text_space =
        layout.page_height_mm - layout.top_margin_mm - layout.bottom_margin_mm - reserved;
    if text_space < MIN_TEXT_SPACE_MM {
        text_space = MIN_TEXT_SPACE_MM;
    }

    let line_height = if flat.is_empty() {
        layout.min_line_height_mm
    } else {
        (text_space / flat.len() as f64)
            .clamp(layout.min_line_height_mm, layout.max_line_height_mm)
    };

    let mut lines = Vec::with_capacity(flat.len());
    let mut y = layout.top_margin_mm;
    for line in flat {
        if line.price_lead {
            y += PRICE_GAP_MM;
        }
        let x = match line.align {
            Align::Left => x0 + layout.side_padding_mm,
            Align::Center => {
                let w = measure.width_mm(&line.text, line.size_pt, line.bold);
                x0 + (layout.label_width_mm - w) / 2.0
            }
        };
        lines.push(PlannedLine {
            text: line.text,
            x_mm: x,
            y_mm: y,
            bold: line.bold,
            size_pt: line.size_pt,
        });
        y += line_height;
    }

    let barcode = barcode.map(|code| {
        let usable = layout.label_width_mm - 2.0 * BARCODE_SIDE_PAD_MM;
        let module_width_mm = usable / code.module_count as f64;
        PlannedBarcode {
            value: record.barcode_value().to_string(),
            x_mm: x0 + BARCODE_SIDE_PAD_MM,
            // Anchored to the bottom of the label, inside the reserved strip.
            y_mm: layout.page_height_mm - layout.bottom_margin_mm - layout.barcode_height_mm,
            module_width_mm,
            height_mm: layout.barcode_height_mm,
            code,
        }
    });

    LabelPlan {
        sku: record.sku.clone(),
        lines,
        barcode,
    }
}

// =============================================================================
// Text Wrapping
// =============================================================================

/// Greedy word wrap against the measured width.
///
/// A single word wider than the line is split hard at character level, so
/// no fragment ever overflows the label. Always returns at least one
/// fragment.
pub fn wrap_text<M: TextMeasure>(
    text: &str,
    max_width_mm: f64,
    size_pt: u8,
    bold: bool,
    measure: &M,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if measure.width_mm(&candidate, size_pt, bold) <= max_width_mm {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }

        if measure.width_mm(word, size_pt, bold) <= max_width_mm {
            current = word.to_string();
        } else {
            // Word alone is too wide: split at character granularity.
            for ch in word.chars() {
                let mut candidate = current.clone();
                candidate.push(ch);
                if !current.is_empty()
                    && measure.width_mm(&candidate, size_pt, bold) > max_width_mm
                {
                    out.push(std::mem::take(&mut current));
                    current.push(ch);
                } else {
                    current = candidate;
                }
            }
        }
    }

    if !current.is_empty() || out.is_empty() {
        out.push(current);
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::MonospaceMeasure;
    use std::collections::BTreeMap;

    fn record(sku: &str) -> LabelRecord {
        LabelRecord {
            sku: sku.to_string(),
            name: format!("Shirt {}", sku),
            price_cents: 2450,
            barcode: None,
            stock_qty: 1,
            size: Some("104".to_string()),
            composition: Some("cotton 95%".to_string()),
            manufacturer: None,
            attributes: BTreeMap::new(),
        }
    }

    fn measure() -> MonospaceMeasure {
        MonospaceMeasure { advance_mm: 0.2 }
    }

    #[test]
    fn test_plan_is_deterministic() {
        let records: Vec<LabelRecord> = (0..5).map(|i| record(&format!("S{}", i))).collect();
        let layout = LabelLayout::default();
        let a = plan_document(&records, &layout, &measure()).unwrap();
        let b = plan_document(&records, &layout, &measure()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pagination_and_grid_positions() {
        let records: Vec<LabelRecord> = (0..7).map(|i| record(&format!("S{}", i))).collect();
        let layout = LabelLayout::default();
        let plan = plan_document(&records, &layout, &measure()).unwrap();

        // 7 labels, 3 per page -> 3 pages (3 + 3 + 1).
        assert_eq!(plan.pages.len(), 3);
        assert_eq!(plan.pages[0].labels.len(), 3);
        assert_eq!(plan.pages[2].labels.len(), 1);
        assert_eq!(plan.label_count, 7);

        // Column origins step by label width.
        let left_edges: Vec<f64> = plan.pages[0]
            .labels
            .iter()
            .map(|l| l.lines.iter().map(|ln| ln.x_mm).fold(f64::MAX, f64::min))
            .collect();
        assert!(left_edges[0] < left_edges[1] && left_edges[1] < left_edges[2]);
        assert!(left_edges[1] >= layout.label_width_mm);
        assert!(left_edges[2] >= 2.0 * layout.label_width_mm);
    }

    #[test]
    fn test_empty_records_make_empty_plan() {
        let plan = plan_document(&[], &LabelLayout::default(), &measure()).unwrap();
        assert!(plan.pages.is_empty());
        assert_eq!(plan.label_count, 0);
    }

    #[test]
    fn test_missing_required_field_fails_fast() {
        let mut layout = LabelLayout::default();
        // Make size required; second record lacks it.
        for line in &mut layout.lines {
            if line.field == LabelField::Size {
                line.required = true;
            }
        }
        let mut no_size = record("S2");
        no_size.size = None;

        let err = plan_document(&[record("S0"), no_size], &layout, &measure()).unwrap_err();
        assert_eq!(
            err,
            LayoutError::MissingValue {
                sku: "S2".to_string(),
                field: "size".to_string(),
            }
        );
    }

    #[test]
    fn test_optional_empty_line_is_skipped() {
        let with = record("S1");
        let mut without = record("S2");
        without.composition = None;
        let layout = LabelLayout::default();

        let plan = plan_document(&[with, without], &layout, &measure()).unwrap();
        let counts: Vec<usize> = plan.pages[0].labels.iter().map(|l| l.lines.len()).collect();
        assert!(counts[0] > counts[1]);
    }

    #[test]
    fn test_unencodable_barcode_fails_before_planning() {
        let mut bad = record("Арт-1"); // non-ASCII SKU, barcode enabled
        bad.barcode = None;
        let err = plan_document(&[bad], &LabelLayout::default(), &measure()).unwrap_err();
        assert!(matches!(err, LayoutError::Barcode { .. }));
    }

    #[test]
    fn test_barcode_geometry_fits_label() {
        let layout = LabelLayout::default();
        let plan = plan_document(&[record("S1")], &layout, &measure()).unwrap();
        let bc = plan.pages[0].labels[0].barcode.as_ref().unwrap();

        let total_width = bc.module_width_mm * bc.code.module_count as f64;
        assert!(total_width <= layout.label_width_mm);
        assert!(bc.y_mm + bc.height_mm <= layout.page_height_mm);
    }

    #[test]
    fn test_barcode_disabled() {
        let mut layout = LabelLayout::default();
        layout.barcode = false;
        let plan = plan_document(&[record("S1")], &layout, &measure()).unwrap();
        assert!(plan.pages[0].labels[0].barcode.is_none());
    }

    #[test]
    fn test_line_heights_respect_clamps() {
        let layout = LabelLayout::default();
        let plan = plan_document(&[record("S1")], &layout, &measure()).unwrap();
        let ys: Vec<f64> = plan.pages[0].labels[0]
            .lines
            .iter()
            .map(|l| l.y_mm)
            .collect();
        for pair in ys.windows(2) {
            let step = pair[1] - pair[0];
            // The price gap may add to a step; no step may be below the
            // minimum line height.
            assert!(step >= layout.min_line_height_mm - 1e-9);
            assert!(step <= layout.max_line_height_mm + PRICE_GAP_MM + 1e-9);
        }
    }

    #[test]
    fn test_wrap_splits_on_words() {
        let m = MonospaceMeasure { advance_mm: 1.0 };
        // 10 mm at 1 pt -> 10 chars per line.
        let wrapped = wrap_text("aaa bbb ccc ddd", 10.0, 1, false, &m);
        assert_eq!(wrapped, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn test_wrap_hard_splits_long_words() {
        let m = MonospaceMeasure { advance_mm: 1.0 };
        let wrapped = wrap_text("abcdefghijkl", 5.0, 1, false, &m);
        assert_eq!(wrapped, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn test_wrap_empty_text() {
        let m = MonospaceMeasure { advance_mm: 1.0 };
        assert_eq!(wrap_text("", 5.0, 1, false, &m), vec![String::new()]);
    }
}
