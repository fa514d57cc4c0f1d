//! # Error Types
//!
//! Layout and planning errors for labelpress-core.
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field name, SKU, line index)
//! 3. Errors are enum variants, never String
//! 4. Every variant is raised *before* any rendering starts, so a failed
//!    plan can never leave a partial output file behind

use thiserror::Error;

/// Errors raised while validating a layout against a set of records or
/// while planning a document.
///
/// All of these are detected in the planning stage; the rendering backend
/// only ever sees a plan that already passed validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    /// The layout itself is malformed (bad dimensions, empty line list).
    #[error("invalid layout '{layout}': {reason}")]
    InvalidLayout { layout: String, reason: String },

    /// A line references an attribute field but carries no attribute key.
    #[error("layout line {index} references an attribute without a key")]
    AttributeKeyMissing { index: usize },

    /// A static line carries no text.
    #[error("layout line {index} is static but has no text")]
    StaticTextMissing { index: usize },

    /// A record is missing a value for a field the layout requires.
    ///
    /// ## When This Occurs
    /// - A required column was NULL in the database
    /// - The layout references an attribute the record does not carry
    ///
    /// Raised for the *first* offending record; nothing is rendered.
    #[error("record '{sku}' has no value for required field '{field}'")]
    MissingValue { sku: String, field: String },

    /// The barcode value contains characters Code 128 subset B cannot encode.
    #[error("barcode value '{value}' for record '{sku}' is not encodable")]
    Barcode { sku: String, value: String },
}

/// Result type for planning operations.
pub type PlanResult<T> = Result<T, LayoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LayoutError::MissingValue {
            sku: "SKU-1".to_string(),
            field: "price".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "record 'SKU-1' has no value for required field 'price'"
        );

        let err = LayoutError::AttributeKeyMissing { index: 3 };
        assert_eq!(
            err.to_string(),
            "layout line 3 references an attribute without a key"
        );
    }
}
