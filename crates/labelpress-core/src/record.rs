//! # Label Records
//!
//! The label record is one unit of product data used to render a single
//! label. Records are produced by the fetcher in `labelpress-db`, are
//! immutable, and are consumed by the document planner.
//!
//! ## Field Access
//! The layout references record fields by name ([`crate::layout::LabelField`]);
//! [`LabelRecord::field_value`] is the single lookup point the planner uses,
//! so the column-to-field mapping stays in exactly one place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::layout::LabelField;

// =============================================================================
// Label Record
// =============================================================================

/// One row of product data, ready to be rendered as a label.
///
/// ## Dual-Key Identity
/// The SKU is the business identifier; there is no surrogate key because
/// records never round-trip back into the database.
///
/// ## Why integer cents?
/// Prices are stored as cents (i64). Floating point money drifts
/// (`0.1 + 0.2 != 0.3`); cents never do. Formatting to "12.34" happens
/// only at display time via [`LabelRecord::price_display`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Stock Keeping Unit - business identifier, also the barcode payload.
    pub sku: String,

    /// Display name shown at the top of the label.
    pub name: String,

    /// Price in cents.
    pub price_cents: i64,

    /// Barcode payload override. Falls back to the SKU when absent.
    pub barcode: Option<String>,

    /// Units in stock; drives quantity expansion (one label per unit).
    pub stock_qty: i64,

    /// Garment size / growth value, when the product has one.
    pub size: Option<String>,

    /// Fabric composition line.
    pub composition: Option<String>,

    /// Manufacturer / origin line.
    pub manufacturer: Option<String>,

    /// Free-form attributes (color, pattern, ...), keyed by attribute name.
    /// BTreeMap keeps iteration deterministic.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl LabelRecord {
    /// Formats the price for display, e.g. `1234` -> `"12.34"`.
    pub fn price_display(&self) -> String {
        let sign = if self.price_cents < 0 { "-" } else { "" };
        let cents = self.price_cents.abs();
        format!("{}{}.{:02}", sign, cents / 100, cents % 100)
    }

    /// Returns the barcode payload: the explicit barcode if set, else the SKU.
    pub fn barcode_value(&self) -> &str {
        self.barcode.as_deref().unwrap_or(&self.sku)
    }

    /// Resolves a layout field reference against this record.
    ///
    /// Returns `None` when the record carries no value for the field;
    /// the planner decides whether that skips the line or fails the plan
    /// (depending on the line's `required` flag).
    pub fn field_value(&self, field: &LabelField, key: Option<&str>) -> Option<String> {
        match field {
            LabelField::Name => Some(self.name.clone()),
            LabelField::Sku => Some(self.sku.clone()),
            LabelField::Price => Some(self.price_display()),
            LabelField::Size => self.size.clone(),
            LabelField::Composition => self.composition.clone(),
            LabelField::Manufacturer => self.manufacturer.clone(),
            LabelField::Quantity => Some(self.stock_qty.to_string()),
            LabelField::Attribute => key.and_then(|k| self.attributes.get(k).cloned()),
            // Static lines never consult the record.
            LabelField::Static => None,
        }
    }
}

// =============================================================================
// Quantity Expansion
// =============================================================================

/// Expands records by stock quantity: one label per unit in stock.
///
/// ## Behavior
/// - `use_stock_quantity = false`: exactly one label per record
/// - `stock_qty <= 0`: still one label (a product with no stock on record
///   gets a single label rather than silently disappearing)
///
/// Order of the input sequence is preserved; copies of the same record are
/// adjacent.
pub fn expand_by_quantity(records: &[LabelRecord], use_stock_quantity: bool) -> Vec<LabelRecord> {
    let mut expanded = Vec::new();
    for record in records {
        let count = if use_stock_quantity {
            record.stock_qty.max(1)
        } else {
            1
        };
        for _ in 0..count {
            expanded.push(record.clone());
        }
    }
    expanded
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sku: &str, qty: i64) -> LabelRecord {
        LabelRecord {
            sku: sku.to_string(),
            name: format!("Product {}", sku),
            price_cents: 1999,
            barcode: None,
            stock_qty: qty,
            size: None,
            composition: None,
            manufacturer: None,
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_price_display() {
        let mut r = record("A", 1);
        assert_eq!(r.price_display(), "19.99");

        r.price_cents = 500;
        assert_eq!(r.price_display(), "5.00");

        r.price_cents = 7;
        assert_eq!(r.price_display(), "0.07");

        r.price_cents = -1250;
        assert_eq!(r.price_display(), "-12.50");
    }

    #[test]
    fn test_barcode_falls_back_to_sku() {
        let mut r = record("SKU-9", 1);
        assert_eq!(r.barcode_value(), "SKU-9");

        r.barcode = Some("4601234567890".to_string());
        assert_eq!(r.barcode_value(), "4601234567890");
    }

    #[test]
    fn test_field_value_lookup() {
        let mut r = record("SKU-1", 3);
        r.size = Some("104".to_string());
        r.attributes.insert("color".to_string(), "blue".to_string());

        assert_eq!(
            r.field_value(&LabelField::Name, None),
            Some("Product SKU-1".to_string())
        );
        assert_eq!(
            r.field_value(&LabelField::Size, None),
            Some("104".to_string())
        );
        assert_eq!(r.field_value(&LabelField::Composition, None), None);
        assert_eq!(
            r.field_value(&LabelField::Attribute, Some("color")),
            Some("blue".to_string())
        );
        assert_eq!(r.field_value(&LabelField::Attribute, Some("missing")), None);
        assert_eq!(r.field_value(&LabelField::Static, None), None);
    }

    #[test]
    fn test_expand_by_quantity() {
        let records = vec![record("A", 3), record("B", 1)];
        let expanded = expand_by_quantity(&records, true);
        let skus: Vec<&str> = expanded.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["A", "A", "A", "B"]);
    }

    #[test]
    fn test_expand_ignores_stock_when_disabled() {
        let records = vec![record("A", 3), record("B", 7)];
        assert_eq!(expand_by_quantity(&records, false).len(), 2);
    }

    #[test]
    fn test_expand_zero_stock_yields_one_label() {
        let records = vec![record("A", 0), record("B", -2)];
        assert_eq!(expand_by_quantity(&records, true).len(), 2);
    }
}
