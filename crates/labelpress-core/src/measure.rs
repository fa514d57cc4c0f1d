//! # Text Measurement Seam
//!
//! Planning needs to know how wide a piece of text will be, but this crate
//! must not touch font files. The [`TextMeasure`] trait is the seam: the
//! PDF layer implements it with real glyph metrics, tests implement it
//! with a fixed-advance stand-in.

/// Measures rendered text width, in millimeters.
///
/// Implementations must be deterministic: the same text, size and face
/// always measure the same. The planner relies on that for reproducible
/// plans.
pub trait TextMeasure {
    /// Width of `text` at `size_pt` points in the regular or bold face.
    fn width_mm(&self, text: &str, size_pt: u8, bold: bool) -> f64;
}

/// Fixed-advance measurement: every character is `advance_mm * size_pt`
/// wide. Not typographically honest, but deterministic and dependency-free;
/// used by planner tests and as a stand-in when no font is available.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasure {
    /// Advance per character per point, millimeters.
    pub advance_mm: f64,
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        // Roughly matches DejaVu Sans at small sizes.
        MonospaceMeasure { advance_mm: 0.21 }
    }
}

impl TextMeasure for MonospaceMeasure {
    fn width_mm(&self, text: &str, size_pt: u8, _bold: bool) -> f64 {
        text.chars().count() as f64 * self.advance_mm * size_pt as f64
    }
}
