//! # Label Layout
//!
//! The declarative description of how a label looks: page and label
//! dimensions, margins, font sizing, and an ordered list of line
//! specifications. Loaded from `settings.json`, treated as a value type,
//! never mutated at runtime.
//!
//! ## Layout Geometry
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One page (page_width x page_height)                │
//! │                                                                         │
//! │  ┌─ label 0 ──────┐┌─ label 1 ──────┐┌─ label 2 ──────┐                │
//! │  │ top margin     ││                ││                │                 │
//! │  │ Name (bold)    ││  ...           ││  ...           │  labels flow   │
//! │  │ Art: SKU ...   ││                ││                │  left→right,   │
//! │  │ Composition:.. ││                ││                │  then the page │
//! │  │ PRICE: 12.34   ││                ││                │  breaks        │
//! │  │ ▐▌▐ barcode ▌▐ ││                ││                │                 │
//! │  │ bottom margin  ││                ││                │                 │
//! │  └────────────────┘└────────────────┘└────────────────┘                │
//! │        label_width                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All lengths are millimeters; conversion to PDF points happens in the
//! rendering backend.

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

// =============================================================================
// Defaults
// =============================================================================
// Default geometry of the thermal label stock this tool was written for:
// 120x70 mm pages with three 40 mm labels side by side.

fn default_layout_name() -> String {
    "standard".to_string()
}
fn default_page_width() -> f64 {
    120.0
}
fn default_page_height() -> f64 {
    70.0
}
fn default_label_width() -> f64 {
    40.0
}
fn default_labels_per_page() -> u32 {
    3
}
fn default_top_margin() -> f64 {
    2.0
}
fn default_bottom_margin() -> f64 {
    0.0
}
fn default_side_padding() -> f64 {
    1.5
}
fn default_font_size() -> u8 {
    6
}
fn default_price_font_size() -> u8 {
    8
}
fn default_min_line_height() -> f64 {
    2.0
}
fn default_max_line_height() -> f64 {
    4.0
}
fn default_barcode_enabled() -> bool {
    true
}
fn default_barcode_height() -> f64 {
    6.0
}

// =============================================================================
// Line Specification
// =============================================================================

/// Horizontal alignment of a line within the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    #[default]
    Left,
    Center,
}

/// Record field a layout line can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelField {
    Name,
    Sku,
    Price,
    Size,
    Composition,
    Manufacturer,
    Quantity,
    /// Free-form attribute; the line's `key` selects which one.
    Attribute,
    /// Fixed text; the line's `text` carries the content.
    Static,
}

impl LabelField {
    /// Field name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            LabelField::Name => "name",
            LabelField::Sku => "sku",
            LabelField::Price => "price",
            LabelField::Size => "size",
            LabelField::Composition => "composition",
            LabelField::Manufacturer => "manufacturer",
            LabelField::Quantity => "quantity",
            LabelField::Attribute => "attribute",
            LabelField::Static => "static",
        }
    }
}

/// One line of the label.
///
/// A line resolves to `prefix + field value` (or the static `text`). Lines
/// whose field resolves to nothing are skipped when `required` is false and
/// fail the whole plan when it is true — a record that cannot satisfy the
/// layout is rejected before anything renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSpec {
    /// Which record field this line shows.
    pub field: LabelField,

    /// Attribute key, when `field` is `attribute`.
    #[serde(default)]
    pub key: Option<String>,

    /// Fixed content, when `field` is `static`.
    #[serde(default)]
    pub text: Option<String>,

    /// Text prepended to the field value, e.g. `"Composition: "`.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Render in the bold face.
    #[serde(default)]
    pub bold: bool,

    /// Horizontal alignment.
    #[serde(default)]
    pub align: Align,

    /// Whether a missing value fails the plan instead of skipping the line.
    #[serde(default)]
    pub required: bool,
}

impl LineSpec {
    fn field(field: LabelField) -> Self {
        LineSpec {
            field,
            key: None,
            text: None,
            prefix: None,
            bold: false,
            align: Align::Left,
            required: false,
        }
    }

    fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn static_text(text: &str) -> Self {
        let mut line = LineSpec::field(LabelField::Static);
        line.text = Some(text.to_string());
        line
    }
}

// =============================================================================
// Label Layout
// =============================================================================

/// Declarative label layout. See the module docs for the geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelLayout {
    /// Layout name, referenced from the settings file.
    #[serde(default = "default_layout_name")]
    pub name: String,

    /// Page width in millimeters.
    #[serde(default = "default_page_width")]
    pub page_width_mm: f64,

    /// Page height in millimeters.
    #[serde(default = "default_page_height")]
    pub page_height_mm: f64,

    /// Width of a single label in millimeters.
    #[serde(default = "default_label_width")]
    pub label_width_mm: f64,

    /// Labels placed side by side before the page breaks.
    #[serde(default = "default_labels_per_page")]
    pub labels_per_page: u32,

    /// Top margin inside each label, millimeters.
    #[serde(default = "default_top_margin")]
    pub top_margin_mm: f64,

    /// Bottom margin inside each label, millimeters.
    #[serde(default = "default_bottom_margin")]
    pub bottom_margin_mm: f64,

    /// Left/right padding inside each label, millimeters.
    #[serde(default = "default_side_padding")]
    pub side_padding_mm: f64,

    /// Base font size in points.
    #[serde(default = "default_font_size")]
    pub font_size: u8,

    /// Font size of the price line in points.
    #[serde(default = "default_price_font_size")]
    pub price_font_size: u8,

    /// Lower clamp for the computed line height, millimeters.
    #[serde(default = "default_min_line_height")]
    pub min_line_height_mm: f64,

    /// Upper clamp for the computed line height, millimeters.
    #[serde(default = "default_max_line_height")]
    pub max_line_height_mm: f64,

    /// Whether to render a Code 128 barcode of the SKU.
    #[serde(default = "default_barcode_enabled")]
    pub barcode: bool,

    /// Barcode height in millimeters.
    #[serde(default = "default_barcode_height")]
    pub barcode_height_mm: f64,

    /// Ordered line specifications.
    #[serde(default = "LabelLayout::default_lines")]
    pub lines: Vec<LineSpec>,
}

impl Default for LabelLayout {
    fn default() -> Self {
        // serde_json::from_str("{}") and Default must agree; both route
        // through the same default fns.
        LabelLayout {
            name: default_layout_name(),
            page_width_mm: default_page_width(),
            page_height_mm: default_page_height(),
            label_width_mm: default_label_width(),
            labels_per_page: default_labels_per_page(),
            top_margin_mm: default_top_margin(),
            bottom_margin_mm: default_bottom_margin(),
            side_padding_mm: default_side_padding(),
            font_size: default_font_size(),
            price_font_size: default_price_font_size(),
            min_line_height_mm: default_min_line_height(),
            max_line_height_mm: default_max_line_height(),
            barcode: default_barcode_enabled(),
            barcode_height_mm: default_barcode_height(),
            lines: Self::default_lines(),
        }
    }
}

impl LabelLayout {
    /// The stock garment label: name, article/size, composition,
    /// manufacturer block, date line, price. Mirrors the label this tool
    /// has always printed; custom layouts replace `lines` wholesale.
    pub fn default_lines() -> Vec<LineSpec> {
        vec![
            LineSpec::field(LabelField::Name).bold().centered().required(),
            LineSpec::field(LabelField::Sku)
                .with_prefix("Art: ")
                .bold()
                .required(),
            LineSpec::field(LabelField::Size).with_prefix("Size: "),
            LineSpec::field(LabelField::Composition).with_prefix("Composition: "),
            LineSpec::field(LabelField::Manufacturer).with_prefix("Made by: "),
            LineSpec::static_text("Manufactured: ______ 20__"),
            LineSpec::field(LabelField::Price)
                .with_prefix("PRICE: ")
                .bold()
                .required(),
        ]
    }

    /// Validates the layout's own shape (not yet against records).
    ///
    /// Checked here once, so the planner can assume a well-formed layout:
    /// - dimensions and clamps are positive and consistent
    /// - at least one label fits on the page
    /// - attribute lines carry keys, static lines carry text
    pub fn validate(&self) -> Result<(), LayoutError> {
        let invalid = |reason: &str| LayoutError::InvalidLayout {
            layout: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.page_width_mm <= 0.0 || self.page_height_mm <= 0.0 {
            return Err(invalid("page dimensions must be positive"));
        }
        if self.label_width_mm <= 0.0 {
            return Err(invalid("label width must be positive"));
        }
        if self.labels_per_page == 0 {
            return Err(invalid("labels_per_page must be at least 1"));
        }
        if self.label_width_mm * self.labels_per_page as f64 > self.page_width_mm + 0.001 {
            return Err(invalid("labels do not fit on the page width"));
        }
        if self.min_line_height_mm <= 0.0 || self.max_line_height_mm < self.min_line_height_mm {
            return Err(invalid("line height clamps are inconsistent"));
        }
        if self.top_margin_mm + self.bottom_margin_mm >= self.page_height_mm {
            return Err(invalid("margins leave no vertical space"));
        }
        if self.lines.is_empty() {
            return Err(invalid("layout has no lines"));
        }

        for (index, line) in self.lines.iter().enumerate() {
            match line.field {
                LabelField::Attribute if line.key.is_none() => {
                    return Err(LayoutError::AttributeKeyMissing { index });
                }
                LabelField::Static if line.text.is_none() => {
                    return Err(LayoutError::StaticTextMissing { index });
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Usable text width inside one label, millimeters.
    pub fn text_width_mm(&self) -> f64 {
        self.label_width_mm - 2.0 * self.side_padding_mm
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
