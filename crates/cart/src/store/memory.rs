//! In-process cart store.
//!
//! Behaves like the document store (lazy creation on read, additive and
//! absolute quantity writes) and can be told to fail upcoming calls, which is
//! how the reconciler's failure paths are exercised.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use storefront_cart_core::{Cart, OwnerId, ProductId, ProductSnapshot, Quantity};
use tokio::sync::Mutex;

use super::{CartStore, StoreError};

/// A write accepted by [`MemoryCartStore`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedWrite {
    Add {
        product_id: ProductId,
        delta: Quantity,
    },
    Set {
        product_id: ProductId,
        quantity: Quantity,
    },
    Remove {
        product_id: ProductId,
    },
    Clear,
}

/// In-memory [`CartStore`].
///
/// Clones share the same carts.
#[derive(Clone, Default)]
pub struct MemoryCartStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    carts: HashMap<OwnerId, Cart>,
    fail_reads: u32,
    fail_writes: u32,
    reads: u32,
    writes: Vec<RecordedWrite>,
}

impl MemoryState {
    fn take_read_fault(&mut self) -> Result<(), StoreError> {
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        self.reads += 1;
        Ok(())
    }

    fn take_write_fault(&mut self) -> Result<(), StoreError> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }

    fn cart_or_empty(&self, owner: &OwnerId) -> Cart {
        self.carts
            .get(owner)
            .cloned()
            .unwrap_or_else(|| Cart::empty(owner))
    }

    fn existing_cart(&self, owner: &OwnerId) -> Result<Cart, StoreError> {
        self.carts
            .get(owner)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("cart for owner {owner}")))
    }

    fn commit(&mut self, owner: &OwnerId, cart: Cart, write: RecordedWrite) -> Cart {
        self.carts.insert(owner.clone(), cart.clone());
        self.writes.push(write);
        cart
    }
}

impl MemoryCartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `cart` under its owner, replacing any existing cart.
    ///
    /// Seeding is not recorded as a write.
    pub async fn insert(&self, cart: Cart) {
        let mut state = self.inner.lock().await;
        state.carts.insert(cart.owner_id().clone(), cart);
    }

    /// The stored cart for `owner`, without counting as a read.
    pub async fn stored(&self, owner: &OwnerId) -> Option<Cart> {
        self.inner.lock().await.carts.get(owner).cloned()
    }

    /// Make the next `n` reads fail with [`StoreError::Unavailable`].
    pub async fn fail_next_reads(&self, n: u32) {
        self.inner.lock().await.fail_reads = n;
    }

    /// Make the next `n` writes fail with [`StoreError::Unavailable`].
    pub async fn fail_next_writes(&self, n: u32) {
        self.inner.lock().await.fail_writes = n;
    }

    /// Number of successful reads so far.
    pub async fn read_count(&self) -> u32 {
        self.inner.lock().await.reads
    }

    /// Successful writes so far, in order.
    pub async fn writes(&self) -> Vec<RecordedWrite> {
        self.inner.lock().await.writes.clone()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn get_cart(&self, owner: &OwnerId) -> Result<Cart, StoreError> {
        let mut state = self.inner.lock().await;
        state.take_read_fault()?;

        let cart = state
            .carts
            .entry(owner.clone())
            .or_insert_with(|| Cart::empty(owner));
        Ok(cart.clone())
    }

    async fn add_quantity(
        &self,
        owner: &OwnerId,
        product: &ProductSnapshot,
        delta: Quantity,
    ) -> Result<Cart, StoreError> {
        let mut state = self.inner.lock().await;
        state.take_write_fault()?;

        let updated = state
            .cart_or_empty(owner)
            .with_added(product, delta)
            .ok_or_else(|| StoreError::QuantityOverflow(product.product_id.clone()))?;

        Ok(state.commit(
            owner,
            updated,
            RecordedWrite::Add {
                product_id: product.product_id.clone(),
                delta,
            },
        ))
    }

    async fn set_quantity(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<Cart, StoreError> {
        let mut state = self.inner.lock().await;
        state.take_write_fault()?;

        let updated = state
            .existing_cart(owner)?
            .with_line_quantity(product_id, quantity)
            .ok_or_else(|| StoreError::NotFound(format!("cart line {product_id}")))?;

        Ok(state.commit(
            owner,
            updated,
            RecordedWrite::Set {
                product_id: product_id.clone(),
                quantity,
            },
        ))
    }

    async fn remove_line(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<Cart, StoreError> {
        let mut state = self.inner.lock().await;
        state.take_write_fault()?;

        let updated = state
            .existing_cart(owner)?
            .without_line(product_id)
            .ok_or_else(|| StoreError::InvalidDocument("cart total overflows".to_string()))?;

        Ok(state.commit(
            owner,
            updated,
            RecordedWrite::Remove {
                product_id: product_id.clone(),
            },
        ))
    }

    async fn clear(&self, owner: &OwnerId) -> Result<Cart, StoreError> {
        let mut state = self.inner.lock().await;
        state.take_write_fault()?;

        Ok(state.commit(owner, Cart::empty(owner), RecordedWrite::Clear))
    }
}
