//! Cart Repository
//!
//! The `carts` collection holds exactly one document per owner (best-effort;
//! a racing first-bind by two clients may briefly create two, see
//! [`CartRepository::find_by_owner`]). Documents are written as full values:
//! there is no per-field merge at the storage layer.

use super::{CartPush, RepoError, RepoResult};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use shared::models::{Cart, CartLineItem};
use surrealdb::engine::local::Db;
use surrealdb::{Action, Notification, RecordId, Surreal};
use uuid::Uuid;

const TABLE: &str = "carts";

/// Storage seam for the cart collection
#[async_trait]
pub trait CartRepository: Send + Sync + 'static {
    /// Find the owner's cart
    ///
    /// Expects at most one document; when duplicates exist all readers
    /// converge on the same one (lowest record id).
    async fn find_by_owner(&self, owner_id: &str) -> RepoResult<Option<Cart>>;

    /// Create a new cart document with a client-allocated record key
    async fn create(&self, cart: &Cart) -> RepoResult<Cart>;

    /// Upsert the full cart value keyed by its document id
    async fn upsert(&self, cart: &Cart) -> RepoResult<Cart>;

    /// Overwrite the cart's lines with an empty list
    async fn clear_lines(&self, cart_id: &str, updated_at: i64) -> RepoResult<()>;

    /// Live push feed for the owner's cart document
    ///
    /// Delivers one [`CartPush`] per remote change until the stream is
    /// dropped.
    async fn watch_owner(&self, owner_id: &str) -> RepoResult<BoxStream<'static, CartPush>>;
}

/// Write payload: the record id never travels inside the document body
#[derive(Debug, Serialize)]
struct CartDoc {
    owner_id: String,
    lines: Vec<CartLineItem>,
    created_at: i64,
    updated_at: i64,
}

impl CartDoc {
    fn from_cart(cart: &Cart) -> Self {
        Self {
            owner_id: cart.owner_id.clone(),
            lines: cart.lines.clone(),
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }
    }
}

/// Read shape: ids arrive native at this layer
#[derive(Debug, Deserialize)]
struct CartRecord {
    id: RecordId,
    owner_id: String,
    #[serde(default)]
    lines: Vec<CartLineItem>,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    updated_at: i64,
}

impl From<CartRecord> for Cart {
    fn from(record: CartRecord) -> Self {
        Self {
            id: Some(record.id.to_string()),
            owner_id: record.owner_id,
            lines: record.lines,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// SurrealDB-backed cart repository
#[derive(Clone)]
pub struct SurrealCartRepository {
    db: Surreal<Db>,
}

impl SurrealCartRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CartRepository for SurrealCartRepository {
    async fn find_by_owner(&self, owner_id: &str) -> RepoResult<Option<Cart>> {
        let mut result = self
            .db
            .query("SELECT * FROM carts WHERE owner_id = $owner ORDER BY id LIMIT 1")
            .bind(("owner", owner_id.to_string()))
            .await
            .map_err(RepoError::database)?;
        let records: Vec<CartRecord> = result.take(0).map_err(RepoError::decode)?;
        Ok(records.into_iter().next().map(Cart::from))
    }

    async fn create(&self, cart: &Cart) -> RepoResult<Cart> {
        let key = Uuid::new_v4().simple().to_string();
        let created: Option<CartRecord> = self
            .db
            .create((TABLE, key.as_str()))
            .content(CartDoc::from_cart(cart))
            .await
            .map_err(RepoError::database)?;
        created
            .map(Cart::from)
            .ok_or_else(|| RepoError::Database("cart create returned no record".to_string()))
    }

    async fn upsert(&self, cart: &Cart) -> RepoResult<Cart> {
        let id = cart
            .id
            .as_deref()
            .ok_or_else(|| RepoError::Database("cart has no document id".to_string()))?;
        let record_id: RecordId = id
            .parse()
            .map_err(|_| RepoError::Database(format!("invalid cart id: {id}")))?;
        let updated: Option<CartRecord> = self
            .db
            .upsert(record_id)
            .content(CartDoc::from_cart(cart))
            .await
            .map_err(RepoError::database)?;
        updated
            .map(Cart::from)
            .ok_or_else(|| RepoError::Database(format!("cart {id} upsert returned no record")))
    }

    async fn clear_lines(&self, cart_id: &str, updated_at: i64) -> RepoResult<()> {
        let record_id: RecordId = cart_id
            .parse()
            .map_err(|_| RepoError::Database(format!("invalid cart id: {cart_id}")))?;
        let mut result = self
            .db
            .query("UPDATE $cart SET lines = [], updated_at = $now")
            .bind(("cart", record_id))
            .bind(("now", updated_at))
            .await
            .map_err(RepoError::database)?;
        let _updated: Vec<CartRecord> = result.take(0).map_err(RepoError::decode)?;
        Ok(())
    }

    async fn watch_owner(&self, owner_id: &str) -> RepoResult<BoxStream<'static, CartPush>> {
        let mut result = self
            .db
            .query("LIVE SELECT * FROM carts WHERE owner_id = $owner")
            .bind(("owner", owner_id.to_string()))
            .await
            .map_err(RepoError::database)?;
        let stream = result
            .stream::<Notification<CartRecord>>(0)
            .map_err(RepoError::database)?;
        let pushes = stream.filter_map(|item| {
            futures::future::ready(match item {
                Ok(notification) => match notification.action {
                    Action::Create | Action::Update => {
                        Some(CartPush::Upserted(Cart::from(notification.data)))
                    }
                    Action::Delete => Some(CartPush::Removed),
                    _ => None,
                },
                Err(err) => Some(CartPush::Malformed(err.to_string())),
            })
        });
        Ok(pushes.boxed())
    }
}
