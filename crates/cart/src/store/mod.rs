//! Remote cart persistence.
//!
//! # Architecture
//!
//! - The store is the source of truth - the reconciler never trusts its own
//!   patches, it re-reads after every write
//! - No atomicity is assumed across calls; mutations are read-modify-write on
//!   a single cart document, last write wins
//! - Two quantity primitives with different semantics: [`CartStore::add_quantity`]
//!   is additive, [`CartStore::set_quantity`] is absolute
//!
//! # Implementations
//!
//! - [`HttpCartStore`] - REST document store (one JSON document per owner)
//! - [`MemoryCartStore`] - in-process store with fault injection

mod document;
mod http;
mod memory;

pub use document::{CartDocument, CartItemDocument};
pub use http::HttpCartStore;
pub use memory::{MemoryCartStore, RecordedWrite};

use async_trait::async_trait;
use storefront_cart_core::{Cart, OwnerId, ProductId, ProductSnapshot, Quantity, QuantityChange};
use thiserror::Error;

/// Errors that can occur when talking to the cart store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response decoded but does not describe a valid cart.
    #[error("Invalid cart document: {0}")]
    InvalidDocument(String),

    /// Cart or line not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the store.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The store answered with a non-success status.
    #[error("Store returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// First part of the response body.
        body: String,
    },

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The requested quantity does not fit.
    #[error("Quantity overflow for product {0}")]
    QuantityOverflow(ProductId),
}

/// Remote persistence for carts, keyed by owner.
///
/// Every mutating method returns the cart as the store holds it after the
/// write. Callers that need an authoritative view must still re-read with
/// [`CartStore::get_cart`]; the return value of a write only reflects that
/// one call.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Fetch the owner's cart, creating an empty one if none exists.
    async fn get_cart(&self, owner: &OwnerId) -> Result<Cart, StoreError>;

    /// Add `delta` units of `product` (`quantity += delta`).
    ///
    /// Inserts a new line if the product is not in the cart yet.
    async fn add_quantity(
        &self,
        owner: &OwnerId,
        product: &ProductSnapshot,
        delta: Quantity,
    ) -> Result<Cart, StoreError>;

    /// Overwrite a line's quantity (`quantity := quantity`).
    ///
    /// Returns [`StoreError::NotFound`] if the line does not exist.
    async fn set_quantity(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<Cart, StoreError>;

    /// Delete a line. Removing a missing line is not an error.
    async fn remove_line(&self, owner: &OwnerId, product_id: &ProductId)
    -> Result<Cart, StoreError>;

    /// Replace the owner's cart with an empty one.
    async fn clear(&self, owner: &OwnerId) -> Result<Cart, StoreError>;

    /// Apply a planned quantity change to an existing line.
    async fn apply_change(
        &self,
        owner: &OwnerId,
        product: &ProductSnapshot,
        change: QuantityChange,
    ) -> Result<Cart, StoreError> {
        match change {
            QuantityChange::AddDelta(delta) => self.add_quantity(owner, product, delta).await,
            QuantityChange::SetAbsolute(quantity) => {
                self.set_quantity(owner, &product.product_id, quantity).await
            }
        }
    }
}
