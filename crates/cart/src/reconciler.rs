//! Optimistic cart mutation with mandatory reconciliation.
//!
//! Every write is a two-phase operation:
//!
//! 1. **Predict** - patch the local cart so the screen can update at once.
//! 2. **Reconcile** - issue the store call, then re-read the cart. The re-read
//!    is the only value ever returned to the caller.
//!
//! The store's quantity primitives differ (additive vs absolute), so a local
//! patch alone can drift from the stored total. Re-reading after each write
//! keeps lines and total consistent with the store.
//!
//! When anything fails, the local cart ends up either as the store reports
//! it or, if the store cannot be read, as it was before the operation.

use storefront_cart_core::{
    Cart, CartLine, CartPhase, OwnerId, ProductId, ProductSnapshot, Quantity, QuantityChange,
};
use tracing::{debug, instrument, warn};

use crate::error::{CartError, Result, add_breadcrumb, report_invariant};
use crate::store::CartStore;

/// The store call a mutation makes.
enum Write<'a> {
    Change {
        product: &'a ProductSnapshot,
        change: QuantityChange,
    },
    Add {
        product: &'a ProductSnapshot,
        delta: Quantity,
    },
    Remove(&'a ProductId),
    Clear,
}

/// Client-side cart state for one cart-bearing screen.
///
/// Operations take `&mut self`: a reconciler runs one operation at a time,
/// including its reconciling read. Drop it when the screen goes away.
pub struct CartReconciler<S> {
    store: S,
    cart: Option<Cart>,
    phase: CartPhase,
}

impl<S: CartStore> CartReconciler<S> {
    /// Create a reconciler with no cart loaded.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self {
            store,
            cart: None,
            phase: CartPhase::Uninitialized,
        }
    }

    /// The cart currently displayed, if one has been loaded.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        self.cart.as_ref()
    }

    #[must_use]
    pub const fn phase(&self) -> CartPhase {
        self.phase
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Fetch the authoritative cart for `owner`.
    ///
    /// On failure the previously loaded cart stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::RemoteUnavailable`] if the store cannot be read,
    /// or [`CartError::InvariantViolated`] if it returns an inconsistent cart.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn load(&mut self, owner: &OwnerId) -> Result<Cart> {
        add_breadcrumb("load cart", &[("owner", owner.as_str())]);

        self.phase = CartPhase::Loading;
        let result = self.fetch(owner).await;
        self.settle();

        result
    }

    /// Add one unit to an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidOperation`] if the cart is not loaded for
    /// `owner` or has no such line; remote failures as for [`Self::load`].
    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    pub async fn increment(&mut self, owner: &OwnerId, product_id: &ProductId) -> Result<Cart> {
        add_breadcrumb("increment", &[("product_id", product_id.as_str())]);

        let line = self.existing_line(owner, product_id)?;
        let target = line.quantity.checked_add(1).ok_or_else(|| {
            CartError::InvalidOperation(format!("quantity of {product_id} is at its maximum"))
        })?;

        self.change_quantity(owner, &line, target).await
    }

    /// Remove one unit from an existing line.
    ///
    /// A line at quantity 1 is left untouched and the current cart is
    /// returned without contacting the store; use [`Self::remove`] to drop
    /// the line.
    ///
    /// # Errors
    ///
    /// As for [`Self::increment`].
    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    pub async fn decrement(&mut self, owner: &OwnerId, product_id: &ProductId) -> Result<Cart> {
        add_breadcrumb("decrement", &[("product_id", product_id.as_str())]);

        let line = self.existing_line(owner, product_id)?;
        let Some(target) = line.quantity.decremented() else {
            debug!("Decrement at quantity 1 ignored");
            return self.current();
        };

        self.change_quantity(owner, &line, target).await
    }

    /// Set a line to `target` units.
    ///
    /// Growth uses the store's additive primitive, shrinking its absolute
    /// one. Asking for the current quantity makes no remote call.
    ///
    /// # Errors
    ///
    /// As for [`Self::increment`].
    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id, target = %target))]
    pub async fn set_quantity(
        &mut self,
        owner: &OwnerId,
        product_id: &ProductId,
        target: Quantity,
    ) -> Result<Cart> {
        let target_str = target.to_string();
        add_breadcrumb(
            "set quantity",
            &[("product_id", product_id.as_str()), ("quantity", &target_str)],
        );

        let line = self.existing_line(owner, product_id)?;
        self.change_quantity(owner, &line, target).await
    }

    /// Delete a line from the cart.
    ///
    /// Confirming with the shopper is the caller's job; this deletes
    /// unconditionally.
    ///
    /// # Errors
    ///
    /// As for [`Self::increment`].
    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    pub async fn remove(&mut self, owner: &OwnerId, product_id: &ProductId) -> Result<Cart> {
        add_breadcrumb("remove line", &[("product_id", product_id.as_str())]);

        self.existing_line(owner, product_id)?;
        let predicted = self.loaded(owner)?.without_line(product_id);

        self.mutate(owner, Write::Remove(product_id), predicted)
            .await
    }

    /// Add `quantity` units of `product`, creating the line if needed.
    ///
    /// Works without a loaded cart; the reconciling read loads it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidOperation`] if a cart for another owner is
    /// loaded; remote failures as for [`Self::load`].
    #[instrument(skip(self, product), fields(owner = %owner, product_id = %product.product_id, quantity = %quantity))]
    pub async fn add_product(
        &mut self,
        owner: &OwnerId,
        product: &ProductSnapshot,
        quantity: Quantity,
    ) -> Result<Cart> {
        add_breadcrumb("add to cart", &[("product_id", product.product_id.as_str())]);

        self.check_owner(owner)?;
        let predicted = self
            .cart
            .as_ref()
            .and_then(|cart| cart.with_added(product, quantity));

        self.mutate(
            owner,
            Write::Add {
                product,
                delta: quantity,
            },
            predicted,
        )
        .await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// As for [`Self::add_product`].
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn clear(&mut self, owner: &OwnerId) -> Result<Cart> {
        add_breadcrumb("clear cart", &[("owner", owner.as_str())]);

        self.check_owner(owner)?;
        self.mutate(owner, Write::Clear, Some(Cart::empty(owner)))
            .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn change_quantity(
        &mut self,
        owner: &OwnerId,
        line: &CartLine,
        target: Quantity,
    ) -> Result<Cart> {
        let Some(change) = QuantityChange::plan(line.quantity, target) else {
            debug!("Quantity unchanged, nothing to write");
            return self.current();
        };

        let predicted = change
            .predict(line.quantity)
            .and_then(|quantity| {
                self.cart
                    .as_ref()?
                    .with_line_quantity(&line.product_id, quantity)
            });
        let product = line.product();

        self.mutate(
            owner,
            Write::Change {
                product: &product,
                change,
            },
            predicted,
        )
        .await
    }

    /// Patch locally, write, then re-read.
    async fn mutate(
        &mut self,
        owner: &OwnerId,
        write: Write<'_>,
        predicted: Option<Cart>,
    ) -> Result<Cart> {
        let snapshot = self.cart.clone();

        self.phase = CartPhase::Mutating;
        if let Some(predicted) = predicted {
            self.cart = Some(predicted);
        }

        let written = match write {
            Write::Change { product, change } => {
                self.store.apply_change(owner, product, change).await
            }
            Write::Add { product, delta } => self.store.add_quantity(owner, product, delta).await,
            Write::Remove(product_id) => self.store.remove_line(owner, product_id).await,
            Write::Clear => self.store.clear(owner).await,
        };

        self.phase = CartPhase::Reconciling;
        let result = match written {
            Ok(_) => match self.fetch(owner).await {
                Ok(cart) => Ok(cart),
                Err(e) => {
                    warn!(error = %e, "Reconciling read failed after write; restoring previous cart");
                    self.cart = snapshot;
                    Err(e)
                }
            },
            Err(write_err) => {
                warn!(error = %write_err, "Cart write failed; re-reading to revert");
                if self.fetch(owner).await.is_err() {
                    self.cart = snapshot;
                }
                Err(write_err.into())
            }
        };
        self.settle();

        result
    }

    /// Read from the store and install the result as the local cart.
    async fn fetch(&mut self, owner: &OwnerId) -> Result<Cart> {
        let cart = self.store.get_cart(owner).await.map_err(|e| {
            warn!(error = %e, "Cart read failed; keeping last known cart");
            CartError::from(e)
        })?;

        cart.check_invariants()
            .map_err(|e| report_invariant(owner, e))?;

        debug!(lines = cart.lines().len(), total = %cart.total(), "Cart reconciled");
        self.cart = Some(cart.clone());
        Ok(cart)
    }

    fn settle(&mut self) {
        self.phase = if self.cart.is_some() {
            CartPhase::Ready
        } else {
            CartPhase::Uninitialized
        };
    }

    fn current(&self) -> Result<Cart> {
        self.cart.clone().ok_or_else(CartError::not_loaded)
    }

    fn check_owner(&self, owner: &OwnerId) -> Result<()> {
        match &self.cart {
            Some(cart) if cart.owner_id() != owner => {
                Err(CartError::owner_mismatch(cart.owner_id(), owner))
            }
            _ => Ok(()),
        }
    }

    fn loaded(&self, owner: &OwnerId) -> Result<&Cart> {
        let cart = self.cart.as_ref().ok_or_else(CartError::not_loaded)?;
        if cart.owner_id() != owner {
            return Err(CartError::owner_mismatch(cart.owner_id(), owner));
        }
        Ok(cart)
    }

    fn existing_line(&self, owner: &OwnerId, product_id: &ProductId) -> Result<CartLine> {
        self.loaded(owner)?
            .line(product_id)
            .cloned()
            .ok_or_else(|| CartError::line_not_found(product_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use storefront_cart_core::{CartId, Price};

    use super::*;
    use crate::store::{MemoryCartStore, RecordedWrite};

    fn owner() -> OwnerId {
        OwnerId::new("uid-1")
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn product(id: &str, price: u64) -> ProductSnapshot {
        ProductSnapshot {
            product_id: ProductId::new(id),
            display_name: format!("Product {id}"),
            unit_price: Price::from_units(price),
            image_ref: String::new(),
        }
    }

    async fn loaded_with(lines: &[(&str, u64, u32)]) -> CartReconciler<MemoryCartStore> {
        let store = MemoryCartStore::new();
        let cart = Cart::from_lines(
            CartId::for_owner(&owner()),
            owner(),
            lines
                .iter()
                .map(|(id, price, n)| product(id, *price).into_line(qty(*n)))
                .collect(),
        )
        .unwrap();
        store.insert(cart).await;

        let mut reconciler = CartReconciler::new(store);
        reconciler.load(&owner()).await.unwrap();
        reconciler
    }

    #[tokio::test]
    async fn test_new_is_uninitialized() {
        let reconciler = CartReconciler::new(MemoryCartStore::new());
        assert_eq!(reconciler.phase(), CartPhase::Uninitialized);
        assert!(reconciler.cart().is_none());
    }

    #[tokio::test]
    async fn test_load_moves_to_ready() {
        let reconciler = loaded_with(&[("a", 10_000, 2)]).await;
        assert_eq!(reconciler.phase(), CartPhase::Ready);
        assert_eq!(
            reconciler.cart().unwrap().total(),
            Price::from_units(20_000)
        );
    }

    #[tokio::test]
    async fn test_failed_first_load_stays_uninitialized() {
        let store = MemoryCartStore::new();
        store.fail_next_reads(1).await;

        let mut reconciler = CartReconciler::new(store);
        let err = reconciler.load(&owner()).await.unwrap_err();

        assert!(matches!(err, CartError::RemoteUnavailable(_)));
        assert_eq!(reconciler.phase(), CartPhase::Uninitialized);
        assert!(reconciler.cart().is_none());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_stale_cart() {
        let mut reconciler = loaded_with(&[("a", 10_000, 2)]).await;
        let before = reconciler.cart().cloned();

        reconciler.store().fail_next_reads(1).await;
        assert!(reconciler.load(&owner()).await.is_err());

        assert_eq!(reconciler.cart().cloned(), before);
        assert_eq!(reconciler.phase(), CartPhase::Ready);
    }

    #[tokio::test]
    async fn test_increment_uses_add_delta() {
        let mut reconciler = loaded_with(&[("a", 10_000, 2)]).await;

        let cart = reconciler
            .increment(&owner(), &ProductId::new("a"))
            .await
            .unwrap();

        assert_eq!(cart.lines()[0].quantity, qty(3));
        assert_eq!(cart.total(), Price::from_units(30_000));
        assert_eq!(
            reconciler.store().writes().await,
            vec![RecordedWrite::Add {
                product_id: ProductId::new("a"),
                delta: qty(1)
            }]
        );
    }

    #[tokio::test]
    async fn test_decrement_uses_set_absolute() {
        let mut reconciler = loaded_with(&[("a", 10_000, 3)]).await;

        let cart = reconciler
            .decrement(&owner(), &ProductId::new("a"))
            .await
            .unwrap();

        assert_eq!(cart.lines()[0].quantity, qty(2));
        assert_eq!(
            reconciler.store().writes().await,
            vec![RecordedWrite::Set {
                product_id: ProductId::new("a"),
                quantity: qty(2)
            }]
        );
    }

    #[tokio::test]
    async fn test_decrement_at_one_is_ignored() {
        let mut reconciler = loaded_with(&[("a", 10_000, 1)]).await;
        let before = reconciler.cart().cloned().unwrap();
        let reads = reconciler.store().read_count().await;

        let cart = reconciler
            .decrement(&owner(), &ProductId::new("a"))
            .await
            .unwrap();

        assert_eq!(cart, before);
        assert_eq!(cart.total(), Price::from_units(10_000));
        assert!(reconciler.store().writes().await.is_empty());
        assert_eq!(reconciler.store().read_count().await, reads);
    }

    #[tokio::test]
    async fn test_set_quantity_same_value_makes_no_call() {
        let mut reconciler = loaded_with(&[("a", 10_000, 2)]).await;
        let before = reconciler.cart().cloned().unwrap();
        let reads = reconciler.store().read_count().await;

        let cart = reconciler
            .set_quantity(&owner(), &ProductId::new("a"), qty(2))
            .await
            .unwrap();

        assert_eq!(cart, before);
        assert!(reconciler.store().writes().await.is_empty());
        assert_eq!(reconciler.store().read_count().await, reads);
    }

    #[tokio::test]
    async fn test_set_quantity_picks_primitive_by_sign() {
        let mut reconciler = loaded_with(&[("a", 100, 2)]).await;
        let a = ProductId::new("a");

        reconciler.set_quantity(&owner(), &a, qty(5)).await.unwrap();
        let cart = reconciler.set_quantity(&owner(), &a, qty(1)).await.unwrap();

        assert_eq!(cart.total(), Price::from_units(100));
        assert_eq!(
            reconciler.store().writes().await,
            vec![
                RecordedWrite::Add {
                    product_id: a.clone(),
                    delta: qty(3)
                },
                RecordedWrite::Set {
                    product_id: a.clone(),
                    quantity: qty(1)
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_line_is_invalid_and_makes_no_call() {
        let mut reconciler = loaded_with(&[("a", 1, 1)]).await;
        let missing = ProductId::new("missing");

        for result in [
            reconciler.increment(&owner(), &missing).await,
            reconciler.decrement(&owner(), &missing).await,
            reconciler.remove(&owner(), &missing).await,
        ] {
            assert!(matches!(result, Err(CartError::InvalidOperation(_))));
        }
        assert!(reconciler.store().writes().await.is_empty());
        assert_eq!(reconciler.phase(), CartPhase::Ready);
    }

    #[tokio::test]
    async fn test_operations_require_load() {
        let mut reconciler = CartReconciler::new(MemoryCartStore::new());
        let err = reconciler
            .increment(&owner(), &ProductId::new("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn test_owner_mismatch_is_rejected() {
        let mut reconciler = loaded_with(&[("a", 1, 1)]).await;
        let stranger = OwnerId::new("uid-2");

        assert!(matches!(
            reconciler.increment(&stranger, &ProductId::new("a")).await,
            Err(CartError::InvalidOperation(_))
        ));
        assert!(matches!(
            reconciler.clear(&stranger).await,
            Err(CartError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_reverts_through_reload() {
        let mut reconciler = loaded_with(&[("a", 10_000, 3)]).await;
        let before = reconciler.cart().cloned();

        reconciler.store().fail_next_writes(1).await;
        let err = reconciler
            .decrement(&owner(), &ProductId::new("a"))
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::RemoteUnavailable(_)));
        assert_eq!(reconciler.cart().cloned(), before);
        assert_eq!(reconciler.phase(), CartPhase::Ready);
    }

    #[tokio::test]
    async fn test_failed_write_and_failed_reload_restores_snapshot() {
        let mut reconciler = loaded_with(&[("a", 10_000, 3)]).await;
        let before = reconciler.cart().cloned();

        reconciler.store().fail_next_writes(1).await;
        reconciler.store().fail_next_reads(1).await;
        assert!(
            reconciler
                .increment(&owner(), &ProductId::new("a"))
                .await
                .is_err()
        );

        assert_eq!(reconciler.cart().cloned(), before);
        assert_eq!(reconciler.phase(), CartPhase::Ready);
    }

    #[tokio::test]
    async fn test_add_product_without_load() {
        let mut reconciler = CartReconciler::new(MemoryCartStore::new());

        let cart = reconciler
            .add_product(&owner(), &product("a", 5_000), qty(2))
            .await
            .unwrap();

        assert_eq!(cart.total(), Price::from_units(10_000));
        assert_eq!(reconciler.phase(), CartPhase::Ready);
    }

    #[tokio::test]
    async fn test_clear_empties_cart() {
        let mut reconciler = loaded_with(&[("a", 1, 1), ("b", 2, 2)]).await;
        let cart = reconciler.clear(&owner()).await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[tokio::test]
    async fn test_inconsistent_store_cart_is_not_installed() {
        let store = MemoryCartStore::new();
        let bad = Cart::from_parts(
            CartId::for_owner(&owner()),
            owner(),
            vec![product("a", 10_000).into_line(qty(2))],
            Price::from_units(1),
        );
        store.insert(bad).await;

        let mut reconciler = CartReconciler::new(store);
        let err = reconciler.load(&owner()).await.unwrap_err();

        assert!(matches!(err, CartError::InvariantViolated(_)));
        assert!(reconciler.cart().is_none());
    }
}
