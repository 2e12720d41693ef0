//! Order Model

use super::cart::CartLineItem;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// Only the initial assignment happens in this engine; later transitions
/// belong to back-of-house tooling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
}

/// One line of an order, copied by value from a cart line at commit time
///
/// Price and quantity are frozen: later menu or cart changes never reach a
/// placed order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    pub line_id: String,
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub variant_label: Option<String>,
    pub notes: Option<String>,
}

impl From<&CartLineItem> for OrderLineItem {
    fn from(line: &CartLineItem) -> Self {
        Self {
            line_id: line.line_id.clone(),
            menu_item_id: line.menu_item_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            variant_label: line.variant_label.clone(),
            notes: line.notes.clone(),
        }
    }
}

/// A committed order: a value snapshot of a cart plus checkout details
///
/// Immutable after creation except for `status`/`updated_at`; holds no live
/// reference back to the cart it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Document id, allocated client-side before the write
    pub id: Option<String>,
    pub owner_id: String,
    pub lines: Vec<OrderLineItem>,
    /// UTC epoch milliseconds
    pub created_at: i64,
    pub updated_at: i64,
    pub customer_name: String,
    /// Table number or a free-form note such as "Take Away"
    pub table_or_note: String,
    /// Conventional labels: "Cash", "Card", "Transfer", "QRIS"
    pub payment_method: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
}
