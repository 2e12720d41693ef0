//! Cart Store
//!
//! Exactly one live, observable cart per signed-in owner. All reads are
//! served from the latest pushed snapshot; all writes go through this
//! component.
//!
//! # Consistency
//!
//! The published cart is always the most recent value observed from the
//! store for the currently bound owner. A write issued by this client is not
//! guaranteed to be visible in the published cart until the store's own
//! change notification round-trips: `persist` publishes an optimistic copy,
//! and the live subscription reconciles afterwards.
//!
//! Writes are last-write-wins at the whole-document level. There is no
//! version field and no compare-and-swap: two mutations taken from the same
//! pre-write snapshot will lose the earlier one. This is a known limitation
//! of the document contract, kept on purpose rather than papered over.
//!
//! # Cancellation
//!
//! `unbind` (and every re-`bind`) bumps a generation counter before the
//! subscription task is told to stop. Every publish checks the generation
//! first, so a push already in flight can never repopulate state that was
//! cleared or rebound, even if the task has not observed its cancellation
//! token yet.

use crate::db::{CartPush, CartRepository, RepoError};
use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::{Mutex, RwLock};
use shared::error::{AppError, AppResult};
use shared::models::Cart;
use shared::util;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// State shared between the store handle and its subscription task
struct Shared {
    cart_tx: watch::Sender<Option<Cart>>,
    /// Retained user-visible error, rendered as a persistent banner
    last_error: RwLock<Option<String>>,
    /// Bumped on every bind/unbind; publishes tagged with a stale
    /// generation are dropped
    generation: AtomicU64,
}

impl Shared {
    /// Publish the cart unless the tagging generation has been superseded.
    /// Returns whether the generation is still current.
    fn publish_if_current(&self, generation: u64, cart: Option<Cart>) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        self.cart_tx.send_replace(cart);
        true
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_error(&self, message: impl Into<String>) {
        *self.last_error.write() = Some(message.into());
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }
}

struct ActiveSubscription {
    owner_id: String,
    cancel: CancellationToken,
}

/// Live, push-updated cart view bound to one owner at a time
#[derive(Clone)]
pub struct CartStore {
    repo: Arc<dyn CartRepository>,
    shared: Arc<Shared>,
    active: Arc<Mutex<Option<ActiveSubscription>>>,
}

impl CartStore {
    pub fn new(repo: Arc<dyn CartRepository>) -> Self {
        let (cart_tx, _) = watch::channel(None);
        Self {
            repo,
            shared: Arc::new(Shared {
                cart_tx,
                last_error: RwLock::new(None),
                generation: AtomicU64::new(0),
            }),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Bind the store to an owner
    ///
    /// Tears down any existing subscription, resolves the owner's cart
    /// (creating and persisting an empty one when none exists or the stored
    /// document cannot be decoded), publishes it, and starts the live
    /// subscription. The empty-cart creation is idempotent from this
    /// client's viewpoint; a concurrent duplicate created by a racing
    /// client is an accepted rare anomaly, all readers converge on one
    /// document afterwards.
    pub async fn bind(&self, owner_id: &str) -> AppResult<()> {
        self.teardown();
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.cart_tx.send_replace(None);
        self.shared.clear_error();

        // Subscribe before the initial fetch so no change slips between them
        let feed = match self.repo.watch_owner(owner_id).await {
            Ok(feed) => feed,
            Err(err) => {
                self.shared.set_error(err.to_string());
                return Err(err.into());
            }
        };

        let cancel = CancellationToken::new();
        *self.active.lock() = Some(ActiveSubscription {
            owner_id: owner_id.to_string(),
            cancel: cancel.clone(),
        });
        tokio::spawn(run_subscription(
            Arc::clone(&self.shared),
            Arc::clone(&self.repo),
            owner_id.to_string(),
            generation,
            cancel,
            feed,
        ));
        tracing::info!(owner_id = %owner_id, "Cart store bound");

        // The subscription stays up even if this fails: a later remote
        // write can still push the cart in
        let cart = self.resolve_cart(owner_id).await?;
        self.shared.publish_if_current(generation, Some(cart));
        Ok(())
    }

    /// Unbind and clear published state; idempotent
    ///
    /// Called on sign-out. A push already in flight when this runs is
    /// tagged with a superseded generation and can never repopulate the
    /// cleared cart.
    pub fn unbind(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.teardown();
        self.shared.cart_tx.send_replace(None);
        self.shared.clear_error();
    }

    fn teardown(&self) {
        if let Some(active) = self.active.lock().take() {
            active.cancel.cancel();
            tracing::info!(owner_id = %active.owner_id, "Cart subscription cancelled");
        }
    }

    /// Persist the full cart value, `updated_at` set to now
    ///
    /// The optimistic copy is published immediately and returned; the live
    /// subscription is the authority that reconciles state afterwards. On
    /// failure the error is retained for the UI and returned, and the
    /// optimistic copy is not rolled back. Last-write-wins: no version
    /// check guards against a concurrent write from a stale snapshot.
    pub async fn persist(&self, cart: &Cart) -> AppResult<Cart> {
        let generation = self.bound_generation(&cart.owner_id)?;
        let mut cart = cart.clone();
        cart.updated_at = util::now_millis();
        self.shared.publish_if_current(generation, Some(cart.clone()));

        match self.repo.upsert(&cart).await {
            Ok(_) => {
                self.shared.clear_error();
                Ok(cart)
            }
            Err(err) => {
                tracing::error!(owner_id = %cart.owner_id, error = %err, "Cart persist failed");
                self.shared.set_error(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Overwrite the stored cart's lines with an empty list
    ///
    /// No optimistic publish: the emptied cart arrives through the live
    /// subscription once the write lands. Failures are retained and
    /// returned; the caller decides whether they are fatal.
    pub async fn clear(&self, cart: &Cart) -> AppResult<()> {
        let cart_id = cart.id.as_deref().ok_or(AppError::CartUnavailable)?;
        match self.repo.clear_lines(cart_id, util::now_millis()).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(cart_id = %cart_id, error = %err, "Cart clear failed");
                self.shared.set_error(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Watch the published cart
    pub fn subscribe(&self) -> watch::Receiver<Option<Cart>> {
        self.shared.cart_tx.subscribe()
    }

    /// Latest published cart, if any
    pub fn current_cart(&self) -> Option<Cart> {
        self.shared.cart_tx.borrow().clone()
    }

    /// Currently bound owner, if any
    pub fn owner_id(&self) -> Option<String> {
        self.active.lock().as_ref().map(|active| active.owner_id.clone())
    }

    /// Retained user-visible error from the last failed operation
    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.read().clone()
    }

    fn bound_generation(&self, owner_id: &str) -> AppResult<u64> {
        match &*self.active.lock() {
            Some(active) if active.owner_id == owner_id => {
                Ok(self.shared.generation.load(Ordering::SeqCst))
            }
            _ => Err(AppError::NotSignedIn),
        }
    }

    async fn resolve_cart(&self, owner_id: &str) -> AppResult<Cart> {
        match self.repo.find_by_owner(owner_id).await {
            Ok(Some(cart)) => Ok(cart),
            Ok(None) => self.create_empty(owner_id).await,
            Err(err @ RepoError::Decode(_)) => {
                // Malformed document counts as "no valid cart"
                tracing::warn!(owner_id = %owner_id, error = %err, "Cart document malformed, creating a fresh cart");
                self.shared.set_error(err.to_string());
                self.create_empty(owner_id).await
            }
            Err(err) => {
                self.shared.set_error(err.to_string());
                Err(err.into())
            }
        }
    }

    async fn create_empty(&self, owner_id: &str) -> AppResult<Cart> {
        let cart = Cart::empty(owner_id, util::now_millis());
        match self.repo.create(&cart).await {
            Ok(created) => Ok(created),
            Err(err) => {
                self.shared.set_error(err.to_string());
                Err(err.into())
            }
        }
    }
}

/// Long-running push loop for one bound owner
///
/// Exits when the token fires, the feed ends, or its generation is
/// superseded.
async fn run_subscription(
    shared: Arc<Shared>,
    repo: Arc<dyn CartRepository>,
    owner_id: String,
    generation: u64,
    cancel: CancellationToken,
    mut feed: BoxStream<'static, CartPush>,
) {
    loop {
        let push = tokio::select! {
            _ = cancel.cancelled() => break,
            push = feed.next() => match push {
                Some(push) => push,
                None => {
                    tracing::debug!(owner_id = %owner_id, "Cart feed closed");
                    break;
                }
            },
        };

        let still_current = match push {
            CartPush::Upserted(cart) => shared.publish_if_current(generation, Some(cart)),
            CartPush::Removed => {
                tracing::warn!(owner_id = %owner_id, "Cart document removed remotely, recreating");
                recover(&shared, &repo, &owner_id, generation).await
            }
            CartPush::Malformed(cause) => {
                tracing::warn!(owner_id = %owner_id, cause = %cause, "Malformed cart push, recreating");
                shared.set_error(cause);
                recover(&shared, &repo, &owner_id, generation).await
            }
        };
        if !still_current {
            break;
        }
    }
}

/// "No valid cart" recovery: synthesize and persist a fresh empty cart
async fn recover(
    shared: &Shared,
    repo: &Arc<dyn CartRepository>,
    owner_id: &str,
    generation: u64,
) -> bool {
    if !shared.is_current(generation) {
        return false;
    }
    let cart = Cart::empty(owner_id, util::now_millis());
    match repo.create(&cart).await {
        Ok(created) => shared.publish_if_current(generation, Some(created)),
        Err(err) => {
            tracing::error!(owner_id = %owner_id, error = %err, "Cart recovery failed");
            shared.set_error(err.to_string());
            shared.is_current(generation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::mutation;
    use crate::db::testing::MockCartRepository;
    use rust_decimal::Decimal;
    use shared::models::MenuItem;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    fn make_store() -> (CartStore, Arc<MockCartRepository>) {
        let repo = Arc::new(MockCartRepository::default());
        (CartStore::new(repo.clone()), repo)
    }

    fn make_menu_item(id: &str, price: i64) -> MenuItem {
        MenuItem {
            id: Some(id.to_string()),
            name: format!("Item {id}"),
            price: Decimal::from(price),
            category: "Food".to_string(),
            description: String::new(),
        }
    }

    async fn wait_until(
        rx: &mut watch::Receiver<Option<Cart>>,
        predicate: impl Fn(&Option<Cart>) -> bool,
    ) -> Option<Cart> {
        timeout(Duration::from_secs(5), async {
            loop {
                {
                    let current = rx.borrow_and_update();
                    if predicate(&current) {
                        return current.clone();
                    }
                }
                rx.changed().await.expect("cart channel closed");
            }
        })
        .await
        .expect("published cart never matched")
    }

    #[tokio::test]
    async fn test_bind_without_cart_creates_and_publishes_empty() {
        let (store, repo) = make_store();
        store.bind("u1").await.unwrap();

        let published = store.current_cart().expect("no cart published");
        assert_eq!(published.owner_id, "u1");
        assert!(published.id.is_some());
        assert_eq!(published.total_amount(), Decimal::ZERO);
        assert!(store.last_error().is_none());

        // The empty cart was persisted, not just published
        assert!(repo.stored_cart("u1").is_some());
    }

    #[tokio::test]
    async fn test_bind_prefers_existing_cart() {
        let (store, repo) = make_store();
        let existing = repo.create(&Cart::empty("u1", 42)).await.unwrap();

        store.bind("u1").await.unwrap();
        let published = store.current_cart().unwrap();
        assert_eq!(published.id, existing.id);
        assert_eq!(published.created_at, 42);
    }

    #[tokio::test]
    async fn test_pushes_update_the_published_cart() {
        let (store, repo) = make_store();
        store.bind("u1").await.unwrap();
        let mut rx = store.subscribe();

        let mut cart = store.current_cart().unwrap();
        cart = mutation::add_line(&cart, &make_menu_item("m1", 20_000), None, None, 2, None)
            .unwrap();
        repo.push("u1", CartPush::Upserted(cart.clone()));

        let published = wait_until(&mut rx, |cart| {
            cart.as_ref().is_some_and(|cart| !cart.is_empty())
        })
        .await
        .unwrap();
        assert_eq!(published.total_amount(), Decimal::from(40_000));
    }

    #[tokio::test]
    async fn test_unbind_clears_and_suppresses_late_push() {
        let (store, repo) = make_store();
        store.bind("u1").await.unwrap();
        let bound = store.current_cart().unwrap();

        store.unbind();
        assert!(store.current_cart().is_none());
        assert!(store.owner_id().is_none());

        // A push that was already in flight when unbind ran must not
        // repopulate the cleared cart
        repo.push("u1", CartPush::Upserted(bound));
        sleep(Duration::from_millis(50)).await;
        assert!(store.current_cart().is_none());

        // Idempotent
        store.unbind();
        assert!(store.current_cart().is_none());
    }

    #[tokio::test]
    async fn test_rebind_switches_owner_cleanly() {
        let (store, repo) = make_store();
        store.bind("u1").await.unwrap();
        let old_cart = store.current_cart().unwrap();

        store.bind("u2").await.unwrap();
        let published = store.current_cart().unwrap();
        assert_eq!(published.owner_id, "u2");
        assert_eq!(store.owner_id().as_deref(), Some("u2"));

        // A stale push for the previous owner is dropped
        repo.push("u1", CartPush::Upserted(old_cart));
        sleep(Duration::from_millis(50)).await;
        assert_eq!(store.current_cart().unwrap().owner_id, "u2");
    }

    #[tokio::test]
    async fn test_persist_failure_retains_error_and_optimistic_copy() {
        let (store, repo) = make_store();
        store.bind("u1").await.unwrap();

        let cart = store.current_cart().unwrap();
        let mutated =
            mutation::add_line(&cart, &make_menu_item("m1", 20_000), None, None, 1, None).unwrap();

        repo.fail_upsert.store(true, std::sync::atomic::Ordering::SeqCst);
        let err = store.persist(&mutated).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));

        // Retained for the UI banner
        assert!(store.last_error().is_some());
        // The optimistic copy is not rolled back
        assert_eq!(store.current_cart().unwrap().lines, mutated.lines);
        // The remote cart never saw the write
        assert!(repo.stored_cart("u1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persist_success_clears_retained_error() {
        let (store, repo) = make_store();
        store.bind("u1").await.unwrap();
        let cart = store.current_cart().unwrap();

        repo.fail_upsert.store(true, std::sync::atomic::Ordering::SeqCst);
        let _ = store.persist(&cart).await;
        assert!(store.last_error().is_some());

        repo.fail_upsert.store(false, std::sync::atomic::Ordering::SeqCst);
        store.persist(&cart).await.unwrap();
        assert!(store.last_error().is_none());
        assert!(repo.stored_cart("u1").is_some());
    }

    #[tokio::test]
    async fn test_persist_without_binding_is_not_signed_in() {
        let (store, _repo) = make_store();
        let err = store.persist(&Cart::empty("u1", 0)).await.unwrap_err();
        assert_eq!(err, AppError::NotSignedIn);
    }

    #[tokio::test]
    async fn test_persist_for_other_owner_is_not_signed_in() {
        let (store, _repo) = make_store();
        store.bind("u1").await.unwrap();
        let err = store.persist(&Cart::empty("u2", 0)).await.unwrap_err();
        assert_eq!(err, AppError::NotSignedIn);
    }

    #[tokio::test]
    async fn test_bind_recovers_from_a_malformed_cart_document() {
        let (store, repo) = make_store();
        repo.fail_find_decode
            .store(true, std::sync::atomic::Ordering::SeqCst);

        // Decode failure is reported, not returned: bind still succeeds
        // with a fresh cart
        store.bind("u1").await.unwrap();
        let published = store.current_cart().unwrap();
        assert!(published.is_empty());
        assert!(store.last_error().is_some());
    }

    #[tokio::test]
    async fn test_malformed_push_recreates_the_cart() {
        let (store, repo) = make_store();
        store.bind("u1").await.unwrap();
        let original = store.current_cart().unwrap();
        let mut rx = store.subscribe();

        repo.push("u1", CartPush::Malformed("bad payload".to_string()));

        // A fresh cart document replaces the undecodable one
        let recreated = wait_until(&mut rx, |cart| {
            cart.as_ref().is_some_and(|cart| cart.id != original.id)
        })
        .await
        .unwrap();
        assert!(recreated.is_empty());
        assert!(store.last_error().is_some());
    }

    #[tokio::test]
    async fn test_remote_delete_recreates_the_cart() {
        let (store, repo) = make_store();
        store.bind("u1").await.unwrap();
        let original = store.current_cart().unwrap();
        let mut rx = store.subscribe();

        repo.push("u1", CartPush::Removed);

        let recreated = wait_until(&mut rx, |cart| {
            cart.as_ref().is_some_and(|cart| cart.id != original.id)
        })
        .await
        .unwrap();
        assert_eq!(recreated.owner_id, "u1");
        assert!(recreated.is_empty());
    }

    #[tokio::test]
    async fn test_rapid_writes_from_one_snapshot_lose_the_first() {
        // Documented last-write-wins limitation: both mutations read the
        // same pre-write snapshot, so the second persisted value wins and
        // the first line is lost.
        let (store, repo) = make_store();
        store.bind("u1").await.unwrap();

        let snapshot = store.current_cart().unwrap();
        let first =
            mutation::add_line(&snapshot, &make_menu_item("m1", 20_000), None, None, 1, None)
                .unwrap();
        let second =
            mutation::add_line(&snapshot, &make_menu_item("m2", 5_000), None, None, 1, None)
                .unwrap();

        store.persist(&first).await.unwrap();
        store.persist(&second).await.unwrap();

        let stored = repo.stored_cart("u1").unwrap();
        assert_eq!(stored.lines.len(), 1);
        assert_eq!(stored.lines[0].menu_item_id, "m2");
    }
}
