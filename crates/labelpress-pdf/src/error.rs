//! # PDF Error Types
//!
//! Errors raised while loading fonts, rendering a plan, or writing the
//! output file. Planning errors pass through unchanged so callers can
//! tell "your layout/data is wrong" apart from "rendering failed".

use thiserror::Error;

use labelpress_core::LayoutError;

/// PDF layer errors.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The plan could not be built. Raised before any file is touched.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// No usable font was found or a font file failed to parse.
    ///
    /// ## When This Occurs
    /// - None of the search directories contain the configured family
    /// - A TTF file is corrupt
    #[error("font error: {0}")]
    Font(String),

    /// The PDF backend failed while drawing.
    #[error("render error: {0}")]
    Render(String),

    /// Writing the output file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<genpdf::error::Error> for PdfError {
    fn from(err: genpdf::error::Error) -> Self {
        PdfError::Render(err.to_string())
    }
}

/// Result type for PDF operations.
pub type PdfResult<T> = Result<T, PdfError>;
