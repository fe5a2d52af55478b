//! Domain types for the checkout order API.
//!
//! These types mirror the payloads exchanged with the checkout backend.
//! The runtime treats orders as opaque beyond the fields it reads: an order
//! is always replaced wholesale by an API response, never field-patched.

use next_checkout_core::{Amount, PackageId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Order Types
// =============================================================================

/// An order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Whether this line was added through a post-purchase upsell.
    #[serde(default)]
    pub is_upsell: bool,
    /// Product SKU, e.g. `"PKG-12-X"`.
    pub product_sku: String,
    /// Display title of the product.
    pub product_title: String,
    /// Quantity ordered.
    pub quantity: i64,
    /// Unit price including tax.
    pub unit_price_incl_tax: Amount,
    /// Line total including tax.
    pub line_total_incl_tax: Amount,
}

/// The authoritative purchase record returned by the checkout backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Ordered line items.
    pub lines: Vec<OrderLine>,
    /// Order total including tax.
    pub total_incl_tax: Amount,
    /// Whether post-purchase upsells may still be added to this order.
    #[serde(default)]
    pub supports_post_purchase_upsells: bool,
}

// =============================================================================
// Upsell Types
// =============================================================================

/// Package reference as sent by upsell pages.
///
/// Offer templates are loose about the id form; both numeric and string ids
/// appear on the wire and are treated as the same package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackageRef {
    /// Numeric id, e.g. `12`.
    Numeric(i64),
    /// String id, e.g. `"12"`.
    Text(String),
}

impl PackageRef {
    /// The canonical string form of the referenced package.
    #[must_use]
    pub fn to_package_id(&self) -> PackageId {
        match self {
            Self::Numeric(id) => PackageId::new(id.to_string()),
            Self::Text(id) => PackageId::new(id.clone()),
        }
    }
}

impl std::fmt::Display for PackageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => write!(f, "{id}"),
        }
    }
}

/// One package selection inside an upsell request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsellLine {
    /// Package being accepted.
    pub package_id: PackageRef,
    /// Quantity to add.
    pub quantity: i64,
}

/// Payload submitted when a customer accepts a post-purchase upsell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsellRequest {
    /// Packages to add to the order.
    pub lines: Vec<UpsellLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_ref_stringifies_both_forms() {
        assert_eq!(
            PackageRef::Numeric(12).to_package_id(),
            PackageId::new("12")
        );
        assert_eq!(
            PackageRef::Text("12".to_string()).to_package_id(),
            PackageId::new("12")
        );
    }

    #[test]
    fn test_package_ref_deserializes_untagged() {
        let numeric: PackageRef = serde_json::from_str("12").expect("numeric");
        assert_eq!(numeric, PackageRef::Numeric(12));

        let text: PackageRef = serde_json::from_str("\"12\"").expect("text");
        assert_eq!(text, PackageRef::Text("12".to_string()));
    }

    #[test]
    fn test_order_defaults_absent_flags() {
        let order: Order = serde_json::from_str(
            r#"{
                "lines": [{
                    "product_sku": "SKU-1",
                    "product_title": "Widget",
                    "quantity": 1,
                    "unit_price_incl_tax": "10.00",
                    "line_total_incl_tax": "10.00"
                }],
                "total_incl_tax": "10.00"
            }"#,
        )
        .expect("deserialize");

        assert!(!order.supports_post_purchase_upsells);
        assert_eq!(order.lines.len(), 1);
        assert!(!order.lines.first().expect("line").is_upsell);
    }
}
