//! REST document store client.
//!
//! Each owner's cart is one JSON document at `{base}/carts/{owner}`. Reads
//! are `GET`, writes replace the whole document with `PUT`. Mutations are
//! read-modify-write with no precondition, so concurrent writers race and the
//! last `PUT` wins.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use storefront_cart_core::{Cart, OwnerId, ProductId, ProductSnapshot, Quantity};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use super::document::CartDocument;
use super::{CartStore, StoreError};
use crate::config::CartStoreConfig;

const REQUEST_ID_HEADER: &str = "X-Request-Id";
const MAX_LOGGED_BODY: usize = 500;
const MAX_ERROR_BODY: usize = 200;

/// Client for the remote cart document store.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpCartStore {
    inner: Arc<HttpCartStoreInner>,
}

struct HttpCartStoreInner {
    client: reqwest::Client,
    config: CartStoreConfig,
}

impl HttpCartStore {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (e.g. TLS backend
    /// initialisation fails).
    pub fn new(config: CartStoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(HttpCartStoreInner { client, config }),
        })
    }

    fn document_url(&self, owner: &OwnerId) -> Result<Url, StoreError> {
        let mut url = self.inner.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                StoreError::Unavailable(format!(
                    "cannot build document URL from {}",
                    self.inner.config.base_url
                ))
            })?
            .pop_if_empty()
            .push("carts")
            .push(owner.as_str());
        Ok(url)
    }

    /// Fetch the stored document, `None` if the owner has no cart yet.
    async fn fetch_document(&self, owner: &OwnerId) -> Result<Option<CartDocument>, StoreError> {
        let url = self.document_url(owner)?;
        let request_id = Uuid::new_v4();

        let response = self
            .inner
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.inner.config.bearer())
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(%request_id, "No cart document yet");
            return Ok(None);
        }

        let response = check_status(response).await?;
        let body = response.text().await?;

        match serde_json::from_str::<CartDocument>(&body) {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    %request_id,
                    body = %truncate(&body, MAX_LOGGED_BODY),
                    "Failed to parse cart document"
                );
                Err(StoreError::Parse(e))
            }
        }
    }

    /// Fetch and decode the owner's cart, `None` if there is no document.
    async fn fetch_cart(&self, owner: &OwnerId) -> Result<Option<Cart>, StoreError> {
        self.fetch_document(owner)
            .await?
            .map(|document| document.into_cart(owner))
            .transpose()
    }

    /// Replace the stored document with `cart`.
    async fn put_cart(&self, owner: &OwnerId, cart: Cart) -> Result<Cart, StoreError> {
        let url = self.document_url(owner)?;
        let request_id = Uuid::new_v4();
        let document = CartDocument::from_cart(&cart, Utc::now());

        let response = self
            .inner
            .client
            .put(url)
            .header(reqwest::header::AUTHORIZATION, self.inner.config.bearer())
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .json(&document)
            .send()
            .await?;

        check_status(response).await?;
        debug!(%request_id, lines = cart.lines().len(), "Cart document written");

        Ok(cart)
    }

    async fn require_cart(&self, owner: &OwnerId) -> Result<Cart, StoreError> {
        self.fetch_cart(owner)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("cart for owner {owner}")))
    }
}

#[async_trait]
impl CartStore for HttpCartStore {
    #[instrument(skip(self), fields(owner = %owner))]
    async fn get_cart(&self, owner: &OwnerId) -> Result<Cart, StoreError> {
        match self.fetch_cart(owner).await? {
            Some(cart) => Ok(cart),
            None => self.put_cart(owner, Cart::empty(owner)).await,
        }
    }

    #[instrument(skip(self, product), fields(owner = %owner, product_id = %product.product_id, delta = %delta))]
    async fn add_quantity(
        &self,
        owner: &OwnerId,
        product: &ProductSnapshot,
        delta: Quantity,
    ) -> Result<Cart, StoreError> {
        let current = self
            .fetch_cart(owner)
            .await?
            .unwrap_or_else(|| Cart::empty(owner));

        let updated = current
            .with_added(product, delta)
            .ok_or_else(|| StoreError::QuantityOverflow(product.product_id.clone()))?;

        self.put_cart(owner, updated).await
    }

    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id, quantity = %quantity))]
    async fn set_quantity(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<Cart, StoreError> {
        let current = self.require_cart(owner).await?;

        let updated = current
            .with_line_quantity(product_id, quantity)
            .ok_or_else(|| StoreError::NotFound(format!("cart line {product_id}")))?;

        self.put_cart(owner, updated).await
    }

    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    async fn remove_line(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<Cart, StoreError> {
        let current = self.require_cart(owner).await?;
        let updated = current
            .without_line(product_id)
            .ok_or_else(|| StoreError::InvalidDocument("cart total overflows".to_string()))?;

        self.put_cart(owner, updated).await
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn clear(&self, owner: &OwnerId) -> Result<Cart, StoreError> {
        self.put_cart(owner, Cart::empty(owner)).await
    }
}

/// Map rate limiting and non-success statuses to errors.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(StoreError::RateLimited(retry_after));
    }

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(
        status = %status,
        body = %truncate(&body, MAX_LOGGED_BODY),
        "Cart store returned non-success status"
    );

    Err(StoreError::Status {
        status: status.as_u16(),
        body: truncate(&body, MAX_ERROR_BODY),
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
