//! Reconciler over the HTTP store, against a mock document database.
//!
//! Run with: cargo test -p storefront-cart-integration-tests

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use serde_json::json;
use storefront_cart::{CartError, CartReconciler, StoreError};
use storefront_cart_core::{CartPhase, Price, ProductId};
use storefront_cart_integration_tests::{DocumentServer, owner, product, qty};
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{method, path},
};

fn stored_document() -> serde_json::Value {
    json!({
        "user_id": "uid-integration",
        "items": [
            {"product_id": "A", "nama": "Kopi Susu", "harga": 10000, "gambar": "", "quantity": 2}
        ],
        "total": 20000
    })
}

#[tokio::test]
async fn test_first_load_creates_empty_document() {
    let db = DocumentServer::start().await;
    let mut reconciler = CartReconciler::new(db.store());

    let cart = reconciler.load(&owner()).await.unwrap();

    assert!(cart.is_empty());
    let doc = db.document(&owner()).unwrap();
    assert_eq!(doc["user_id"], "uid-integration");
    assert_eq!(doc["items"], json!([]));
}

#[tokio::test]
async fn test_increment_writes_document() {
    let db = DocumentServer::start().await;
    db.put_document(&owner(), stored_document());
    let mut reconciler = CartReconciler::new(db.store());
    reconciler.load(&owner()).await.unwrap();

    let cart = reconciler
        .increment(&owner(), &ProductId::new("A"))
        .await
        .unwrap();

    assert_eq!(cart.total(), Price::from_units(30_000));
    let doc = db.document(&owner()).unwrap();
    assert_eq!(doc["items"][0]["quantity"], 3);
    assert_eq!(doc["items"][0]["nama"], "Kopi Susu");
    assert_eq!(doc["total"].as_f64(), Some(30_000.0));
    assert!(doc["updated_at"].is_string());
}

#[tokio::test]
async fn test_add_then_shrink_and_remove() {
    let db = DocumentServer::start().await;
    let mut reconciler = CartReconciler::new(db.store());

    reconciler
        .add_product(&owner(), &product("B", 2_500), qty(4))
        .await
        .unwrap();
    let cart = reconciler
        .set_quantity(&owner(), &ProductId::new("B"), qty(1))
        .await
        .unwrap();
    assert_eq!(cart.total(), Price::from_units(2_500));

    let cart = reconciler
        .remove(&owner(), &ProductId::new("B"))
        .await
        .unwrap();
    assert!(cart.is_empty());
    assert_eq!(db.document(&owner()).unwrap()["items"], json!([]));
}

#[tokio::test]
async fn test_store_outage_keeps_last_cart() {
    let db = DocumentServer::start().await;
    db.put_document(&owner(), stored_document());
    let mut reconciler = CartReconciler::new(db.store());
    let before = reconciler.load(&owner()).await.unwrap();

    Mock::given(method("GET"))
        .and(path("/carts/uid-integration"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&db.server)
        .await;

    let err = reconciler
        .increment(&owner(), &ProductId::new("A"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CartError::RemoteUnavailable(StoreError::Status { status: 503, .. })
    ));
    assert_eq!(reconciler.cart(), Some(&before));
    assert_eq!(reconciler.phase(), CartPhase::Ready);
    assert_eq!(db.document(&owner()).unwrap()["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn test_rate_limited_write_is_reported() {
    let db = DocumentServer::start().await;
    db.put_document(&owner(), stored_document());
    let mut reconciler = CartReconciler::new(db.store());
    let before = reconciler.load(&owner()).await.unwrap();

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .up_to_n_times(1)
        .mount(&db.server)
        .await;

    let err = reconciler
        .decrement(&owner(), &ProductId::new("A"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CartError::RemoteUnavailable(StoreError::RateLimited(7))
    ));
    assert!(err.is_retryable());
    assert_eq!(reconciler.cart(), Some(&before));
}

#[tokio::test]
async fn test_inconsistent_document_is_rejected() {
    let db = DocumentServer::start().await;
    db.put_document(
        &owner(),
        json!({
            "user_id": "uid-integration",
            "items": [{"product_id": "A", "nama": "A", "harga": 10000, "quantity": 2}],
            "total": 15000
        }),
    );
    let mut reconciler = CartReconciler::new(db.store());

    let err = reconciler.load(&owner()).await.unwrap_err();

    assert!(matches!(err, CartError::InvariantViolated(_)));
    assert!(reconciler.cart().is_none());
    assert_eq!(reconciler.phase(), CartPhase::Uninitialized);
}

#[tokio::test]
async fn test_wrong_api_key_is_unavailable() {
    let db = DocumentServer::start().await;
    let config = storefront_cart::CartStoreConfig::new(
        &db.server.uri(),
        secrecy::SecretString::from("zQ8wV1xR4tY7uI0oP3aS6dF9"),
    )
    .unwrap();
    let store = storefront_cart::HttpCartStore::new(config).unwrap();
    let mut reconciler = CartReconciler::new(store);

    let err = reconciler.load(&owner()).await.unwrap_err();
    assert!(matches!(
        err,
        CartError::RemoteUnavailable(StoreError::Status { status: 401, .. })
    ));
}
