//! Shared types for the Kasir point-of-sale client
//!
//! Domain models (menu, cart, order), the unified error type, and small
//! utility helpers used by the client engine.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult};
pub use serde::{Deserialize, Serialize};
