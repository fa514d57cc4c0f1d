//! # labelpress-pdf: PDF Rendering Layer
//!
//! Takes the deterministic plans built by `labelpress-core` and turns
//! them into PDF files on disk.
//!
//! ## Division of Labor
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  labelpress-core           labelpress-pdf (this crate)                  │
//! │  ────────────────          ─────────────────────────────────────────    │
//! │  what goes where           fonts, glyph metrics (TextMeasure impl)      │
//! │  (all positions in mm)     drawing text and barcode bars                │
//! │                            atomic file output                           │
//! │                            single-label previews                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod fonts;
pub mod generator;
pub mod preview;

pub use error::{PdfError, PdfResult};
pub use fonts::{FontLibrary, DEFAULT_FONT_NAME};
pub use generator::{output_filename, GeneratedDocument, PdfGenerator};
pub use preview::{preview_layout, PdftoppmRasterizer, Rasterizer};
