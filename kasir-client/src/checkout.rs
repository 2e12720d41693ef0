//! Order Committer
//!
//! Turns a non-empty cart into a persisted order, then best-effort clears
//! the source cart. The order write is the durable business fact: once it
//! succeeds, a failed cart clear is reported as a soft warning on the
//! success result, never as an error. A stale cart is a recoverable UI
//! nuisance; rolling back a placed order is not.

use crate::cart::CartStore;
use crate::db::OrderRepository;
use shared::error::{AppError, AppResult};
use shared::models::{Cart, Order, OrderLineItem, OrderStatus};
use shared::util;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Checkout details captured at the register
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_name: String,
    /// Table number or a free-form note such as "Take Away"
    pub table_or_note: String,
    /// Conventional labels: "Cash", "Card", "Transfer", "QRIS"
    pub payment_method: String,
    pub initial_status: OrderStatus,
}

impl CheckoutRequest {
    pub fn new(
        customer_name: impl Into<String>,
        table_or_note: impl Into<String>,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            customer_name: customer_name.into(),
            table_or_note: table_or_note.into(),
            payment_method: payment_method.into(),
            initial_status: OrderStatus::Pending,
        }
    }
}

/// Successful checkout result
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_id: String,
    /// Set when the order was placed but the post-order cart clear failed
    pub cart_clear_warning: Option<String>,
}

/// Converts carts into persisted orders
#[derive(Clone)]
pub struct OrderCommitter {
    orders: Arc<dyn OrderRepository>,
    cart_store: CartStore,
    /// Serializes commits; duplicate submissions wait instead of racing
    commit_lock: Arc<Mutex<()>>,
    in_flight: Arc<AtomicBool>,
}

impl OrderCommitter {
    pub fn new(orders: Arc<dyn OrderRepository>, cart_store: CartStore) -> Self {
        Self {
            orders,
            cart_store,
            commit_lock: Arc::new(Mutex::new(())),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a commit is currently in flight; UIs gate the checkout
    /// action on this to prevent duplicate submissions
    pub fn is_placing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Convert the cart into a persisted order
    ///
    /// Fails with [`AppError::EmptyCart`] before anything is written. The
    /// order's lines, prices and total are value snapshots frozen at this
    /// point; mutating the cart afterwards never reaches the order. The
    /// order id is allocated client-side, so it is known even before the
    /// write is acknowledged. On write failure the cart is left untouched
    /// and no partial order exists.
    pub async fn place_order(
        &self,
        owner_id: &str,
        cart: &Cart,
        request: CheckoutRequest,
    ) -> AppResult<PlacedOrder> {
        let _guard = self.commit_lock.lock().await;
        self.in_flight.store(true, Ordering::SeqCst);
        let result = self.commit(owner_id, cart, request).await;
        // Cleared on success and failure alike; the UI must never be left
        // in an indefinite loading state
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn commit(
        &self,
        owner_id: &str,
        cart: &Cart,
        request: CheckoutRequest,
    ) -> AppResult<PlacedOrder> {
        if cart.is_empty() {
            return Err(AppError::EmptyCart);
        }

        let now = util::now_millis();
        let order = Order {
            id: Some(self.orders.allocate_id()),
            owner_id: owner_id.to_string(),
            lines: cart.lines.iter().map(OrderLineItem::from).collect(),
            created_at: now,
            updated_at: now,
            customer_name: request.customer_name,
            table_or_note: request.table_or_note,
            payment_method: request.payment_method,
            status: request.initial_status,
            total_amount: cart.total_amount(),
        };
        let order_id = order.id.clone().unwrap_or_default();

        if let Err(err) = self.orders.insert(&order).await {
            tracing::error!(owner_id = %owner_id, error = %err, "Order write failed");
            return Err(err.into());
        }
        tracing::info!(
            order_id = %order_id,
            owner_id = %owner_id,
            total = %order.total_amount,
            "Order placed"
        );

        // Best-effort cleanup: the order already exists, so a failure here
        // is a warning on the success result, not an error
        let cart_clear_warning = match self.cart_store.clear(cart).await {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(
                    order_id = %order_id,
                    error = %err,
                    "Order placed but cart clear failed; cart will reconcile later"
                );
                Some(err.to_string())
            }
        };

        Ok(PlacedOrder {
            order_id,
            cart_clear_warning,
        })
    }
}
