//! Session Bridge
//!
//! An explicit, injectable identity feed. Authentication hands this bridge
//! an opaque, already-validated owner id on every transition; the driver
//! task maps those transitions onto the cart store. A new owner behaves
//! exactly like `bind(owner)`, `None` exactly like `unbind()`. No ambient
//! global session state.

use crate::cart::CartStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Identity feed for the signed-in owner
#[derive(Clone)]
pub struct SessionBridge {
    tx: watch::Sender<Option<String>>,
}

impl SessionBridge {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Announce a signed-in owner
    pub fn sign_in(&self, owner_id: impl Into<String>) {
        self.tx.send_replace(Some(owner_id.into()));
    }

    /// Announce sign-out
    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    pub fn current_owner(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

impl Default for SessionBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive the cart store from an identity feed
///
/// Applies the feed's current value, then every transition, until the
/// bridge is dropped.
pub fn drive(store: CartStore, mut identity: watch::Receiver<Option<String>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let owner = identity.borrow_and_update().clone();
            match owner {
                Some(owner_id) => {
                    if let Err(err) = store.bind(&owner_id).await {
                        tracing::error!(owner_id = %owner_id, error = %err, "Cart store bind failed");
                    }
                }
                None => store.unbind(),
            }
            if identity.changed().await.is_err() {
                tracing::debug!("Session bridge dropped, cart store driver stopping");
                store.unbind();
                break;
            }
        }
    })
}
