//! Cart Mutation Engine
//!
//! Pure functions over cart values; no I/O. Every function returns a new
//! cart with `updated_at` advanced and never mutates its input.

use rust_decimal::Decimal;
use shared::error::{AppError, AppResult};
use shared::models::{Cart, CartLineItem, MenuItem};
use shared::util;

/// Add a line for a menu item + variant, merging into an existing line
///
/// The line id derives from the item id and the variant label, so adding the
/// same pair twice accumulates quantity instead of duplicating the line.
/// Non-empty `notes` overwrite the line's notes; empty input never erases
/// them. `unit_price_override` carries the chosen variant's price and falls
/// back to the menu item's base price.
///
/// `quantity` must be at least 1; callers enforce this before invocation.
/// Fails with [`AppError::InvalidMenuItem`] when the menu item has no id.
pub fn add_line(
    cart: &Cart,
    menu_item: &MenuItem,
    variant_label: Option<&str>,
    unit_price_override: Option<Decimal>,
    quantity: i32,
    notes: Option<&str>,
) -> AppResult<Cart> {
    let menu_item_id = menu_item.id.as_deref().ok_or(AppError::InvalidMenuItem)?;
    let line_id = CartLineItem::derive_line_id(menu_item_id, variant_label);
    let notes = notes.filter(|notes| !notes.is_empty()).map(String::from);

    let mut next = cart.clone();
    match next.lines.iter_mut().find(|line| line.line_id == line_id) {
        Some(line) => {
            line.quantity += quantity;
            if notes.is_some() {
                line.notes = notes;
            }
        }
        None => next.lines.push(CartLineItem {
            line_id,
            menu_item_id: menu_item_id.to_string(),
            name: menu_item.name.clone(),
            unit_price: unit_price_override.unwrap_or(menu_item.price),
            quantity,
            variant_label: variant_label.map(String::from),
            notes,
        }),
    }
    next.updated_at = util::now_millis();
    Ok(next)
}

/// Remove a line by id; a no-op when the line is absent
pub fn remove_line(cart: &Cart, line_id: &str) -> Cart {
    let mut next = cart.clone();
    next.lines.retain(|line| line.line_id != line_id);
    next.updated_at = util::now_millis();
    next
}

/// Set a line's quantity; zero or negative removes the line
///
/// Quantity is never persisted at zero or below.
pub fn set_quantity(cart: &Cart, line_id: &str, new_quantity: i32) -> Cart {
    if new_quantity <= 0 {
        return remove_line(cart, line_id);
    }
    let mut next = cart.clone();
    if let Some(line) = next.lines.iter_mut().find(|line| line.line_id == line_id) {
        line.quantity = new_quantity;
    }
    next.updated_at = util::now_millis();
    next
}
