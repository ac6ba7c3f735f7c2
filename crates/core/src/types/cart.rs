//! Cart and cart line values.
//!
//! A [`Cart`] is an immutable value: every change produces a new cart with
//! its total recomputed from the lines, so a value built through these
//! methods always satisfies the total invariant. Carts decoded from a remote
//! store go through [`Cart::from_parts`] and must be checked with
//! [`Cart::check_invariants`] before being shown.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::id::{CartId, OwnerId, ProductId};
use super::price::Price;
use super::quantity::Quantity;

/// Broken cart invariants.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartInvariantError {
    /// The same product appears on more than one line.
    #[error("duplicate cart line for product {0}")]
    DuplicateLine(ProductId),
    /// A line amount or the total does not fit in a price.
    #[error("cart total overflows")]
    TotalOverflow,
    /// The recorded total differs from the sum of the lines.
    #[error("cart total {recorded} does not match line sum {expected}")]
    TotalMismatch {
        /// Total as recorded on the cart.
        recorded: Price,
        /// Sum of `unit_price * quantity` over the lines.
        expected: Price,
    },
}

/// The product data a cart line carries, without a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub display_name: String,
    pub unit_price: Price,
    pub image_ref: String,
}

impl ProductSnapshot {
    /// Build a cart line for this product.
    #[must_use]
    pub fn into_line(self, quantity: Quantity) -> CartLine {
        CartLine {
            product_id: self.product_id,
            display_name: self.display_name,
            unit_price: self.unit_price,
            image_ref: self.image_ref,
            quantity,
        }
    }
}

/// One product entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Unique key of the line within its cart.
    pub product_id: ProductId,
    pub display_name: String,
    pub unit_price: Price,
    pub image_ref: String,
    pub quantity: Quantity,
}

impl CartLine {
    /// `unit_price * quantity`, or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.unit_price.checked_times(self.quantity)
    }

    /// The product data of this line.
    #[must_use]
    pub fn product(&self) -> ProductSnapshot {
        ProductSnapshot {
            product_id: self.product_id.clone(),
            display_name: self.display_name.clone(),
            unit_price: self.unit_price,
            image_ref: self.image_ref.clone(),
        }
    }
}

/// The ordered collection of product lines and their total for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    owner_id: OwnerId,
    lines: Vec<CartLine>,
    total: Price,
}

impl Cart {
    /// An empty cart for `owner`.
    #[must_use]
    pub fn empty(owner: &OwnerId) -> Self {
        Self {
            id: CartId::for_owner(owner),
            owner_id: owner.clone(),
            lines: Vec::new(),
            total: Price::ZERO,
        }
    }

    /// Build a cart from its lines, computing the total.
    ///
    /// # Errors
    ///
    /// Returns [`CartInvariantError::TotalOverflow`] if the total does not
    /// fit in a [`Price`].
    pub fn from_lines(
        id: CartId,
        owner_id: OwnerId,
        lines: Vec<CartLine>,
    ) -> Result<Self, CartInvariantError> {
        let total = sum_lines(&lines).ok_or(CartInvariantError::TotalOverflow)?;
        Ok(Self {
            id,
            owner_id,
            lines,
            total,
        })
    }

    /// Build a cart from a recorded total without checking it.
    ///
    /// Use this for values received from a store, then call
    /// [`Cart::check_invariants`].
    #[must_use]
    pub const fn from_parts(
        id: CartId,
        owner_id: OwnerId,
        lines: Vec<CartLine>,
        total: Price,
    ) -> Self {
        Self {
            id,
            owner_id,
            lines,
            total,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &CartId {
        &self.id
    }

    #[must_use]
    pub const fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub const fn total(&self) -> Price {
        self.total
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of line quantities, as shown on the cart badge.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity.get())).sum()
    }

    /// The line for `product_id`, if present.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    /// A copy of this cart with one line set to `quantity`.
    ///
    /// Returns `None` if there is no line for `product_id` or the total
    /// overflows.
    #[must_use]
    pub fn with_line_quantity(&self, product_id: &ProductId, quantity: Quantity) -> Option<Self> {
        self.line(product_id)?;
        let lines = self
            .lines
            .iter()
            .map(|l| {
                if &l.product_id == product_id {
                    CartLine {
                        quantity,
                        ..l.clone()
                    }
                } else {
                    l.clone()
                }
            })
            .collect();
        Self::from_lines(self.id.clone(), self.owner_id.clone(), lines).ok()
    }

    /// A copy of this cart with `delta` more units of `product`.
    ///
    /// An existing line keeps its product data and accumulates the quantity;
    /// otherwise a new line is appended. Returns `None` on quantity or total
    /// overflow.
    #[must_use]
    pub fn with_added(&self, product: &ProductSnapshot, delta: Quantity) -> Option<Self> {
        let mut lines = self.lines.clone();
        match lines
            .iter_mut()
            .find(|l| l.product_id == product.product_id)
        {
            Some(line) => line.quantity = line.quantity.checked_add(delta.get())?,
            None => lines.push(product.clone().into_line(delta)),
        }
        Self::from_lines(self.id.clone(), self.owner_id.clone(), lines).ok()
    }

    /// A copy of this cart without the line for `product_id`.
    ///
    /// Returns `None` only if the remaining lines overflow, which a cart that
    /// passed [`Cart::check_invariants`] never does.
    #[must_use]
    pub fn without_line(&self, product_id: &ProductId) -> Option<Self> {
        let lines = self
            .lines
            .iter()
            .filter(|l| &l.product_id != product_id)
            .cloned()
            .collect();
        Self::from_lines(self.id.clone(), self.owner_id.clone(), lines).ok()
    }

    /// Verify line keys are unique and the total equals the line sum.
    ///
    /// # Errors
    ///
    /// Returns the first broken invariant found.
    pub fn check_invariants(&self) -> Result<(), CartInvariantError> {
        let mut seen = HashSet::with_capacity(self.lines.len());
        for line in &self.lines {
            if !seen.insert(&line.product_id) {
                return Err(CartInvariantError::DuplicateLine(line.product_id.clone()));
            }
        }

        let expected = sum_lines(&self.lines).ok_or(CartInvariantError::TotalOverflow)?;
        if expected != self.total {
            return Err(CartInvariantError::TotalMismatch {
                recorded: self.total,
                expected,
            });
        }

        Ok(())
    }
}

fn sum_lines(lines: &[CartLine]) -> Option<Price> {
    lines
        .iter()
        .try_fold(Price::ZERO, |total, line| total.checked_add(line.line_total()?))
}
