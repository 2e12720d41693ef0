//! Menu Item Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Menu catalog entry
///
/// Owned by the catalog; read-only from the cart/order engine's viewpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Option<String>,
    pub name: String,
    /// Base price per unit (a variant may override it)
    pub price: Decimal,
    pub category: String,
    pub description: String,
}
