//! Order Repository
//!
//! The `orders` collection is write-once at creation; later status
//! transitions belong to back-of-house tooling and never pass through this
//! client.

use super::{RepoError, RepoResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::{Order, OrderLineItem, OrderStatus};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};
use uuid::Uuid;

const TABLE: &str = "orders";

/// Storage seam for the order collection
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// Allocate a new order document id, synchronously and client-side
    ///
    /// The id is known before the write is acknowledged, so callers may
    /// reference it even while the insert is in flight.
    fn allocate_id(&self) -> String;

    /// Write-once insert; `order.id` must already be allocated
    async fn insert(&self, order: &Order) -> RepoResult<()>;

    async fn find_by_id(&self, order_id: &str) -> RepoResult<Option<Order>>;
}

/// Write payload: the record id never travels inside the document body
#[derive(Debug, Serialize)]
struct OrderDoc {
    owner_id: String,
    lines: Vec<OrderLineItem>,
    created_at: i64,
    updated_at: i64,
    customer_name: String,
    table_or_note: String,
    payment_method: String,
    status: OrderStatus,
    total_amount: rust_decimal::Decimal,
}

impl OrderDoc {
    fn from_order(order: &Order) -> Self {
        Self {
            owner_id: order.owner_id.clone(),
            lines: order.lines.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
            customer_name: order.customer_name.clone(),
            table_or_note: order.table_or_note.clone(),
            payment_method: order.payment_method.clone(),
            status: order.status,
            total_amount: order.total_amount,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderRecord {
    id: RecordId,
    owner_id: String,
    #[serde(default)]
    lines: Vec<OrderLineItem>,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    updated_at: i64,
    customer_name: String,
    table_or_note: String,
    payment_method: String,
    status: OrderStatus,
    total_amount: rust_decimal::Decimal,
}

impl From<OrderRecord> for Order {
    fn from(record: OrderRecord) -> Self {
        Self {
            id: Some(record.id.to_string()),
            owner_id: record.owner_id,
            lines: record.lines,
            created_at: record.created_at,
            updated_at: record.updated_at,
            customer_name: record.customer_name,
            table_or_note: record.table_or_note,
            payment_method: record.payment_method,
            status: record.status,
            total_amount: record.total_amount,
        }
    }
}

/// SurrealDB-backed order repository
#[derive(Clone)]
pub struct SurrealOrderRepository {
    db: Surreal<Db>,
}

impl SurrealOrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderRepository for SurrealOrderRepository {
    fn allocate_id(&self) -> String {
        let key = Uuid::new_v4().simple().to_string();
        RecordId::from_table_key(TABLE, key).to_string()
    }

    async fn insert(&self, order: &Order) -> RepoResult<()> {
        let id = order
            .id
            .as_deref()
            .ok_or_else(|| RepoError::Database("order has no document id".to_string()))?;
        let record_id: RecordId = id
            .parse()
            .map_err(|_| RepoError::Database(format!("invalid order id: {id}")))?;
        let created: Option<OrderRecord> = self
            .db
            .create(record_id)
            .content(OrderDoc::from_order(order))
            .await
            .map_err(RepoError::database)?;
        created
            .map(|_| ())
            .ok_or_else(|| RepoError::Database(format!("order {id} insert returned no record")))
    }

    async fn find_by_id(&self, order_id: &str) -> RepoResult<Option<Order>> {
        let record_id: RecordId = order_id
            .parse()
            .map_err(|_| RepoError::Database(format!("invalid order id: {order_id}")))?;
        let record: Option<OrderRecord> = self
            .db
            .select(record_id)
            .await
            .map_err(RepoError::database)?;
        Ok(record.map(Order::from))
    }
}
