//! Client Facade
//!
//! Wires configuration, the document store, the catalog, the session bridge,
//! the cart store and the order committer into one handle for the UI layer.
//! Every cart/order operation here enforces the signed-in and
//! cart-available preconditions before touching the engine.

use crate::cart::{CartStore, mutation};
use crate::catalog::Catalog;
use crate::checkout::{CheckoutRequest, OrderCommitter, PlacedOrder};
use crate::config::Config;
use crate::db::{self, MenuRepository, OrderRepository, SurrealCartRepository, SurrealOrderRepository};
use crate::session::{self, SessionBridge};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use shared::error::{AppError, AppResult};
use shared::models::{Cart, MenuItem, Order};
use std::sync::Arc;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// The point-of-sale client engine
pub struct PosClient {
    config: Config,
    menu: MenuRepository,
    orders: Arc<SurrealOrderRepository>,
    catalog: RwLock<Catalog>,
    session: SessionBridge,
    cart_store: CartStore,
    committer: OrderCommitter,
    driver: JoinHandle<()>,
}

impl PosClient {
    /// Open the on-disk store under `config.work_dir` and start the engine
    pub async fn connect(config: Config) -> AppResult<Self> {
        let db = db::connect(&config).await?;
        Self::from_db(config, db).await
    }

    /// Start the engine on an in-memory store (tests and demos)
    pub async fn in_memory(config: Config) -> AppResult<Self> {
        let db = db::connect_memory(&config).await?;
        Self::from_db(config, db).await
    }

    async fn from_db(config: Config, db: Surreal<Db>) -> AppResult<Self> {
        let menu = MenuRepository::new(db.clone());
        let catalog = Catalog::load(&menu).await?;

        let cart_store = CartStore::new(Arc::new(SurrealCartRepository::new(db.clone())));
        let orders = Arc::new(SurrealOrderRepository::new(db));
        let committer = OrderCommitter::new(orders.clone(), cart_store.clone());

        let session = SessionBridge::new();
        let driver = session::drive(cart_store.clone(), session.watch());

        tracing::info!(environment = %config.environment, "POS client started");
        Ok(Self {
            config,
            menu,
            orders,
            catalog: RwLock::new(catalog),
            session,
            cart_store,
            committer,
            driver,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Identity feed; authentication calls `sign_in`/`sign_out` here
    pub fn session(&self) -> &SessionBridge {
        &self.session
    }

    /// Menu collection access (provisioning and tests)
    pub fn menu(&self) -> &MenuRepository {
        &self.menu
    }

    /// Current catalog snapshot
    pub fn catalog(&self) -> Catalog {
        self.catalog.read().clone()
    }

    /// Re-fetch the menu from the store
    pub async fn reload_catalog(&self) -> AppResult<()> {
        let catalog = Catalog::load(&self.menu).await?;
        *self.catalog.write() = catalog;
        Ok(())
    }

    /// Watch the published cart
    pub fn cart_watch(&self) -> watch::Receiver<Option<Cart>> {
        self.cart_store.subscribe()
    }

    pub fn current_cart(&self) -> Option<Cart> {
        self.cart_store.current_cart()
    }

    /// Retained user-visible error from the last failed cart operation
    pub fn last_error(&self) -> Option<String> {
        self.cart_store.last_error()
    }

    /// Whether an order commit is in flight
    pub fn is_placing(&self) -> bool {
        self.committer.is_placing()
    }

    /// Add a menu item + variant to the cart and persist the result
    pub async fn add_to_cart(
        &self,
        menu_item: &MenuItem,
        variant_label: Option<&str>,
        unit_price_override: Option<Decimal>,
        quantity: i32,
        notes: Option<&str>,
    ) -> AppResult<Cart> {
        let cart = self.mutable_cart()?;
        let mutated = mutation::add_line(
            &cart,
            menu_item,
            variant_label,
            unit_price_override,
            quantity,
            notes,
        )?;
        self.cart_store.persist(&mutated).await
    }

    /// Remove a cart line and persist the result
    pub async fn remove_from_cart(&self, line_id: &str) -> AppResult<Cart> {
        let cart = self.mutable_cart()?;
        let mutated = mutation::remove_line(&cart, line_id);
        self.cart_store.persist(&mutated).await
    }

    /// Change a cart line's quantity and persist the result; zero or
    /// negative removes the line
    pub async fn set_quantity(&self, line_id: &str, quantity: i32) -> AppResult<Cart> {
        let cart = self.mutable_cart()?;
        let mutated = mutation::set_quantity(&cart, line_id, quantity);
        self.cart_store.persist(&mutated).await
    }

    /// Convert the current cart into a persisted order
    pub async fn place_order(&self, request: CheckoutRequest) -> AppResult<PlacedOrder> {
        let owner_id = self.cart_store.owner_id().ok_or(AppError::NotSignedIn)?;
        let cart = self
            .cart_store
            .current_cart()
            .ok_or(AppError::CartUnavailable)?;
        self.committer.place_order(&owner_id, &cart, request).await
    }

    /// Look up a placed order by id (confirmation views)
    pub async fn find_order(&self, order_id: &str) -> AppResult<Option<Order>> {
        Ok(self.orders.find_by_id(order_id).await?)
    }

    /// Stop the session driver and release the cart subscription
    pub fn shutdown(&self) {
        self.driver.abort();
        self.cart_store.unbind();
        tracing::info!("POS client stopped");
    }

    fn mutable_cart(&self) -> AppResult<Cart> {
        if self.cart_store.owner_id().is_none() {
            return Err(AppError::NotSignedIn);
        }
        self.cart_store
            .current_cart()
            .ok_or(AppError::CartUnavailable)
    }
}
