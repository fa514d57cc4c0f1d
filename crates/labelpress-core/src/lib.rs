//! # labelpress-core: Pure Label Logic
//!
//! This crate is the **heart** of labelpress. It turns product data and a
//! declarative layout into a fully positioned document plan, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      labelpress Data Flow                               │
//! │                                                                         │
//! │  Presentation layer (GUI / CLI)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  labelpress-db ──► Vec<LabelRecord> ─┐                                  │
//! │                                      │                                  │
//! │  ┌───────────────────────────────────▼─────────────────────────────┐    │
//! │  │               ★ labelpress-core (THIS CRATE) ★                  │    │
//! │  │                                                                 │    │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐        │    │
//! │  │   │  record  │  │  layout  │  │   plan   │  │ barcode  │        │    │
//! │  │   │  fields  │  │ LineSpec │  │ grid math│  │ Code 128 │        │    │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────┘        │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO FONT FILES • NO PDF BYTES • PURE FUNCTIONS        │    │
//! │  └───────────────────────────────────┬─────────────────────────────┘    │
//! │                                      │ DocumentPlan                     │
//! │                                      ▼                                  │
//! │                              labelpress-pdf                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`record`] - The label record (one row of product data) and field access
//! - [`layout`] - Declarative label layout (dimensions, margins, line specs)
//! - [`plan`] - Deterministic document planning (wrapping, grid, paging)
//! - [`barcode`] - Code 128 encoding
//! - [`measure`] - Text measurement seam (implemented by the PDF layer)
//! - [`error`] - Layout/planning error types
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: identical records + layout produce an identical plan
//! 2. **Fail fast**: layout/record mismatches are rejected before any output
//! 3. **Integer money**: prices are cents (i64), formatted only for display
//! 4. **Explicit errors**: all failures are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod barcode;
pub mod error;
pub mod layout;
pub mod measure;
pub mod plan;
pub mod record;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::LayoutError;
pub use layout::{Align, LabelField, LabelLayout, LineSpec};
pub use measure::TextMeasure;
pub use plan::{plan_document, DocumentPlan, LabelPlan, PagePlan, PlannedBarcode, PlannedLine};
pub use record::{expand_by_quantity, LabelRecord};
