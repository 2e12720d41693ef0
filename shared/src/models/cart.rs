//! Cart Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line of a cart: menu item + variant + quantity + notes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLineItem {
    /// Deterministic line id: `menu_item_id + "_" + variant_label`
    pub line_id: String,
    pub menu_item_id: String,
    pub name: String,
    /// Price per unit (the chosen variant's price)
    pub unit_price: Decimal,
    /// Always >= 1; a line reaching 0 is removed, never persisted at zero
    pub quantity: i32,
    pub variant_label: Option<String>,
    pub notes: Option<String>,
}

impl CartLineItem {
    /// Derive the deterministic line id for an item + variant pair
    ///
    /// Adding the same pair twice merges quantities instead of creating a
    /// duplicate line; a different variant of the same menu item is a
    /// distinct line.
    pub fn derive_line_id(menu_item_id: &str, variant_label: Option<&str>) -> String {
        format!("{}_{}", menu_item_id, variant_label.unwrap_or_default())
    }

    /// Line contribution to the cart total
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The per-owner, pre-purchase collection of line items
///
/// Exactly one non-deleted cart exists per owner at any time (enforced by
/// the cart store, best-effort). Logically destroyed by overwriting with an
/// empty line list after a successful order, never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Document id, `None` until first persisted
    pub id: Option<String>,
    pub owner_id: String,
    pub lines: Vec<CartLineItem>,
    /// UTC epoch milliseconds
    pub created_at: i64,
    pub updated_at: i64,
}

impl Cart {
    /// A fresh empty cart for an owner
    pub fn empty(owner_id: impl Into<String>, now: i64) -> Self {
        Self {
            id: None,
            owner_id: owner_id.into(),
            lines: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of `unit_price * quantity` over all lines
    pub fn total_amount(&self) -> Decimal {
        self.lines.iter().map(CartLineItem::line_total).sum()
    }

    /// Sum of quantities over all lines
    pub fn total_quantity(&self) -> i32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Find a line by its id
    pub fn line(&self, line_id: &str) -> Option<&CartLineItem> {
        self.lines.iter().find(|line| line.line_id == line_id)
    }
}
