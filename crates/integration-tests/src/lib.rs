//! Integration tests for storefront cart reconciliation.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storefront-cart-integration-tests
//! ```
//!
//! No external services are needed: the HTTP store is exercised against a
//! [`DocumentServer`], a stateful mock of the cart document database.
//!
//! # Test Categories
//!
//! - `cart_reconciler` - Reconciler scenarios against the in-memory store
//! - `http_store_reconcile` - Reconciler over HTTP, including store outages

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use secrecy::SecretString;
use serde_json::Value;
use storefront_cart::{CartStoreConfig, HttpCartStore, MemoryCartStore};
use storefront_cart_core::{Cart, CartId, OwnerId, Price, ProductId, ProductSnapshot, Quantity};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate, matchers::path_regex};

/// API key accepted by [`DocumentServer`].
pub const TEST_API_KEY: &str = "aB3xY9mK2nL5pQ7rT0uW4zC6";

pub fn owner() -> OwnerId {
    OwnerId::new("uid-integration")
}

pub fn qty(n: u32) -> Quantity {
    Quantity::new(n).unwrap()
}

pub fn product(id: &str, price: u64) -> ProductSnapshot {
    ProductSnapshot {
        product_id: ProductId::new(id),
        display_name: format!("Product {id}"),
        unit_price: Price::from_units(price),
        image_ref: format!("https://img.example/{id}.jpg"),
    }
}

/// A consistent cart for [`owner`] with `(product, unit price, quantity)` lines.
pub fn cart_with(lines: &[(&str, u64, u32)]) -> Cart {
    Cart::from_lines(
        CartId::for_owner(&owner()),
        owner(),
        lines
            .iter()
            .map(|&(id, price, n)| product(id, price).into_line(qty(n)))
            .collect(),
    )
    .unwrap()
}

/// An in-memory store seeded with `cart`.
pub async fn seeded_store(cart: Cart) -> MemoryCartStore {
    let store = MemoryCartStore::new();
    store.insert(cart).await;
    store
}

/// Stateful stand-in for the cart document database.
///
/// `GET /carts/{owner}` returns the stored document or 404, and
/// `PUT /carts/{owner}` replaces it. Requests without the test bearer token
/// get 401.
pub struct DocumentServer {
    pub server: MockServer,
    documents: Arc<Mutex<HashMap<String, Value>>>,
}

struct DocumentResponder {
    documents: Arc<Mutex<HashMap<String, Value>>>,
}

impl Respond for DocumentResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let authorized = request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some(format!("Bearer {TEST_API_KEY}").as_str());
        if !authorized {
            return ResponseTemplate::new(401);
        }

        let Some(owner) = request.url.path_segments().and_then(Iterator::last) else {
            return ResponseTemplate::new(400);
        };
        let owner = owner.to_string();
        let mut documents = self
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match request.method.as_str() {
            "GET" => documents.get(&owner).map_or_else(
                || ResponseTemplate::new(404),
                |doc| ResponseTemplate::new(200).set_body_json(doc),
            ),
            "PUT" => match serde_json::from_slice::<Value>(&request.body) {
                Ok(doc) => {
                    documents.insert(owner, doc);
                    ResponseTemplate::new(200)
                }
                Err(_) => ResponseTemplate::new(400),
            },
            _ => ResponseTemplate::new(405),
        }
    }
}

impl DocumentServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let documents = Arc::new(Mutex::new(HashMap::new()));

        Mock::given(path_regex(r"^/carts/[^/]+$"))
            .respond_with(DocumentResponder {
                documents: Arc::clone(&documents),
            })
            .with_priority(10)
            .mount(&server)
            .await;

        Self { server, documents }
    }

    /// A store client pointed at this server.
    pub fn store(&self) -> HttpCartStore {
        let config = CartStoreConfig::new(&self.server.uri(), SecretString::from(TEST_API_KEY))
            .unwrap();
        HttpCartStore::new(config).unwrap()
    }

    /// Store a raw document for `owner`.
    pub fn put_document(&self, owner: &OwnerId, document: Value) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(owner.to_string(), document);
    }

    /// The raw document stored for `owner`.
    pub fn document(&self, owner: &OwnerId) -> Option<Value> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(owner.as_str())
            .cloned()
    }
}
