//! End-to-end flow on the in-memory store: sign in, build a cart through
//! the live store, place an order, and watch the cart reconcile.

use kasir_client::checkout::CheckoutRequest;
use kasir_client::config::Config;
use kasir_client::client::PosClient;
use rust_decimal::Decimal;
use shared::error::AppError;
use shared::models::{Cart, MenuItem, OrderStatus};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

fn test_config() -> Config {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Config {
        work_dir: "/tmp/kasir-test".to_string(),
        db_namespace: "kasir".to_string(),
        db_database: "test".to_string(),
        environment: "development".to_string(),
    }
}

async fn seed_menu(client: &PosClient) {
    for (name, price, category, description) in [
        ("Nasi Goreng", 20_000, "Food", "Fried rice with egg"),
        ("Es Teh", 5_000, "Drinks", "Iced tea"),
    ] {
        client
            .menu()
            .insert(&MenuItem {
                id: None,
                name: name.to_string(),
                price: Decimal::from(price),
                category: category.to_string(),
                description: description.to_string(),
            })
            .await
            .unwrap();
    }
    client.reload_catalog().await.unwrap();
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
async fn test_full_checkout_flow() {
    let client = PosClient::in_memory(test_config()).await.unwrap();
    seed_menu(&client).await;

    // Local catalog filtering, no re-query
    let catalog = client.catalog();
    assert_eq!(catalog.categories(), vec!["All item", "Drinks", "Food"]);
    let hits = catalog.filter("Food", "goreng");
    assert_eq!(hits.len(), 1);
    let nasi_goreng = hits.into_iter().next().unwrap();

    // Signing in binds the store and publishes a fresh empty cart
    let mut cart_rx = client.cart_watch();
    client.session().sign_in("kasir-1");
    let cart = wait_until(&mut cart_rx, Option::is_some).await.unwrap();
    assert_eq!(cart.owner_id, "kasir-1");
    assert_eq!(cart.total_amount(), Decimal::ZERO);

    // Same item + variant merges; totals follow
    client
        .add_to_cart(&nasi_goreng, Some("Biasa"), None, 1, None)
        .await
        .unwrap();
    let cart = client
        .add_to_cart(&nasi_goreng, Some("Biasa"), None, 2, Some("extra sambal"))
        .await
        .unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].quantity, 3);
    assert_eq!(cart.lines[0].notes.as_deref(), Some("extra sambal"));
    assert_eq!(cart.total_amount(), Decimal::from(60_000));

    // Act on the published cart once the pushes for both writes have
    // round-tripped; an intermediate push may briefly show the first write
    let settled = wait_until(&mut cart_rx, |cart| {
        cart.as_ref().is_some_and(|cart| cart.total_quantity() == 3)
    })
    .await
    .unwrap();
    assert_eq!(settled.total_amount(), Decimal::from(60_000));

    // Checkout: the order is persisted with frozen values
    let placed = client
        .place_order(CheckoutRequest::new("Budi", "7", "Cash"))
        .await
        .unwrap();
    assert!(placed.cart_clear_warning.is_none());
    assert!(!client.is_placing());

    let order = client
        .find_order(&placed.order_id)
        .await
        .unwrap()
        .expect("order document missing");
    assert_eq!(order.owner_id, "kasir-1");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, Decimal::from(60_000));
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].quantity, 3);
    assert_eq!(order.payment_method, "Cash");

    // The cart reconciles to empty through the live subscription
    let cleared = wait_until(&mut cart_rx, |cart| {
        cart.as_ref().is_some_and(|cart| cart.is_empty())
    })
    .await
    .unwrap();
    assert_eq!(cleared.id, cart.id);

    client.shutdown();
}

#[tokio::test]
async fn test_operations_require_a_session() {
    let client = PosClient::in_memory(test_config()).await.unwrap();
    seed_menu(&client).await;
    let item = client.catalog().filter("Food", "").remove(0);

    let err = client
        .add_to_cart(&item, None, None, 1, None)
        .await
        .unwrap_err();
    assert_eq!(err, AppError::NotSignedIn);

    let err = client
        .place_order(CheckoutRequest::new("Budi", "7", "Cash"))
        .await
        .unwrap_err();
    assert_eq!(err, AppError::NotSignedIn);
}

#[tokio::test]
async fn test_empty_cart_cannot_be_ordered() {
    let client = PosClient::in_memory(test_config()).await.unwrap();

    let mut cart_rx = client.cart_watch();
    client.session().sign_in("kasir-1");
    wait_until(&mut cart_rx, Option::is_some).await;

    let err = client
        .place_order(CheckoutRequest::new("Budi", "7", "Cash"))
        .await
        .unwrap_err();
    assert_eq!(err, AppError::EmptyCart);

    client.shutdown();
}

#[tokio::test]
async fn test_sign_out_clears_the_published_cart() {
    let client = PosClient::in_memory(test_config()).await.unwrap();
    seed_menu(&client).await;

    let mut cart_rx = client.cart_watch();
    client.session().sign_in("kasir-1");
    wait_until(&mut cart_rx, Option::is_some).await;

    client.session().sign_out();
    wait_until(&mut cart_rx, Option::is_none).await;
    assert!(client.current_cart().is_none());

    // Mutations after sign-out are rejected
    let item = client.catalog().filter("All item", "").remove(0);
    let err = client
        .add_to_cart(&item, None, None, 1, None)
        .await
        .unwrap_err();
    assert_eq!(err, AppError::NotSignedIn);

    client.shutdown();
}

#[tokio::test]
async fn test_sign_in_finds_the_existing_cart_again() {
    let client = PosClient::in_memory(test_config()).await.unwrap();
    seed_menu(&client).await;
    let item = client.catalog().filter("Food", "").remove(0);

    let mut cart_rx = client.cart_watch();
    client.session().sign_in("kasir-1");
    wait_until(&mut cart_rx, Option::is_some).await;
    let cart = client.add_to_cart(&item, None, None, 2, None).await.unwrap();

    // Sign out and back in: the same cart document comes back
    client.session().sign_out();
    wait_until(&mut cart_rx, Option::is_none).await;
    client.session().sign_in("kasir-1");
    let rebound = wait_until(&mut cart_rx, Option::is_some).await.unwrap();
    assert_eq!(rebound.id, cart.id);
    assert_eq!(rebound.total_quantity(), 2);

    client.shutdown();
}
