//! Kasir client engine
//!
//! The cart/order synchronization core of a point-of-sale client: a live,
//! observable cart per signed-in owner, pure cart mutation logic, and the
//! checkout path that turns a cart into a persisted order.
//!
//! # Components
//!
//! ```text
//! SessionBridge ──identity──► CartStore ◄──pushes── document store (carts)
//!                                 │ ▲
//!                    published cart │ persist/clear
//!                                 ▼ │
//!                UI / PosClient ──► mutation (pure) / OrderCommitter ──► orders
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod client;
pub mod config;
pub mod db;
pub mod session;

// Re-exports
pub use cart::CartStore;
pub use catalog::Catalog;
pub use checkout::{CheckoutRequest, OrderCommitter, PlacedOrder};
pub use client::PosClient;
pub use config::Config;
pub use session::SessionBridge;
