//! Cart engine: pure mutation logic and the live cart store

pub mod mutation;
mod store;

pub use store::CartStore;
