//! Menu Repository
//!
//! Read-only access to the `menu_items` collection. The catalog is fetched
//! once and filtered locally, never re-queried per keystroke.

use super::{RepoError, RepoResult};
use serde::Deserialize;
use shared::models::MenuItem;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};
use uuid::Uuid;

const TABLE: &str = "menu_items";

#[derive(Debug, Deserialize)]
struct MenuItemRecord {
    id: RecordId,
    name: String,
    price: rust_decimal::Decimal,
    category: String,
    #[serde(default)]
    description: String,
}

impl From<MenuItemRecord> for MenuItem {
    fn from(record: MenuItemRecord) -> Self {
        Self {
            id: Some(record.id.to_string()),
            name: record.name,
            price: record.price,
            category: record.category,
            description: record.description,
        }
    }
}

#[derive(Clone)]
pub struct MenuRepository {
    db: Surreal<Db>,
}

impl MenuRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    /// Fetch the full menu, paginationless
    pub async fn find_all(&self) -> RepoResult<Vec<MenuItem>> {
        let mut result = self
            .db
            .query("SELECT * FROM menu_items ORDER BY name")
            .await
            .map_err(RepoError::database)?;
        let records: Vec<MenuItemRecord> = result.take(0).map_err(RepoError::decode)?;
        Ok(records.into_iter().map(MenuItem::from).collect())
    }

    /// Insert a menu entry (provisioning and tests)
    pub async fn insert(&self, item: &MenuItem) -> RepoResult<MenuItem> {
        #[derive(serde::Serialize)]
        struct MenuItemDoc {
            name: String,
            price: rust_decimal::Decimal,
            category: String,
            description: String,
        }

        let key = Uuid::new_v4().simple().to_string();
        let created: Option<MenuItemRecord> = self
            .db
            .create((TABLE, key.as_str()))
            .content(MenuItemDoc {
                name: item.name.clone(),
                price: item.price,
                category: item.category.clone(),
                description: item.description.clone(),
            })
            .await
            .map_err(RepoError::database)?;
        created
            .map(MenuItem::from)
            .ok_or_else(|| RepoError::Database("menu item create returned no record".to_string()))
    }
}
