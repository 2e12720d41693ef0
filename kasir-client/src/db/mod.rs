//! Storage Layer
//!
//! Repositories over the embedded document store. Record ids stay native
//! (`RecordId`) inside this module and are exposed to the domain as plain
//! `table:key` strings.
//!
//! The cart and order repositories are traits so the engine can be driven by
//! scripted in-memory implementations in tests; the production
//! implementations run on SurrealDB.

pub mod cart;
pub mod menu;
pub mod order;

// Re-exports
pub use cart::{CartRepository, SurrealCartRepository};
pub use menu::MenuRepository;
pub use order::{OrderRepository, SurrealOrderRepository};

use crate::config::Config;
use shared::error::AppError;
use shared::models::Cart;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};
use thiserror::Error;

/// Repository error types
///
/// Query-phase failures classify as `Database`; extraction/decoding-phase
/// failures classify as `Decode` so a malformed remote document can be
/// recovered from instead of aborting the caller.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl RepoError {
    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Database(cause) => AppError::Persistence(cause),
            RepoError::Decode(cause) => AppError::Decode(cause),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// One remote change to a watched cart document
#[derive(Debug, Clone)]
pub enum CartPush {
    /// The document was created or updated
    Upserted(Cart),
    /// The document was deleted remotely
    Removed,
    /// The change could not be decoded; reported, then treated as absent
    Malformed(String),
}

/// Open the on-disk document store under the configured work directory
pub async fn connect(config: &Config) -> RepoResult<Surreal<Db>> {
    let path = format!("{}/kasir.db", config.work_dir);
    let db = Surreal::new::<RocksDb>(path.as_str())
        .await
        .map_err(RepoError::database)?;
    select_namespace(&db, config).await?;
    tracing::info!(path = %path, "Document store opened");
    Ok(db)
}

/// Open an in-memory document store (tests and demos)
pub async fn connect_memory(config: &Config) -> RepoResult<Surreal<Db>> {
    let db = Surreal::new::<Mem>(())
        .await
        .map_err(RepoError::database)?;
    select_namespace(&db, config).await?;
    Ok(db)
}

async fn select_namespace(db: &Surreal<Db>, config: &Config) -> RepoResult<()> {
    db.use_ns(config.db_namespace.as_str())
        .use_db(config.db_database.as_str())
        .await
        .map_err(RepoError::database)
}
