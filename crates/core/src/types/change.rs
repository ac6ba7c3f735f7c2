//! Remote quantity primitives.
//!
//! The cart store offers two ways to change a line's quantity: an additive
//! one (`quantity += n`) and an absolute one (`quantity := n`). Which one a
//! request uses is decided here, once, by the sign of the requested delta.

use serde::{Deserialize, Serialize};

use super::quantity::Quantity;

/// A quantity write against the cart store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QuantityChange {
    /// Add this many units to the stored quantity.
    AddDelta(Quantity),
    /// Overwrite the stored quantity.
    SetAbsolute(Quantity),
}

impl QuantityChange {
    /// Choose the write that moves `current` to `target`.
    ///
    /// Growth goes through the additive primitive so the store's
    /// accumulation is preserved; shrinking sets the target directly.
    /// Returns `None` when nothing needs to be written.
    ///
    /// ```
    /// use storefront_cart_core::{Quantity, QuantityChange};
    ///
    /// let two = Quantity::new(2).unwrap();
    /// let five = Quantity::new(5).unwrap();
    ///
    /// assert_eq!(
    ///     QuantityChange::plan(two, five),
    ///     Some(QuantityChange::AddDelta(Quantity::new(3).unwrap()))
    /// );
    /// assert_eq!(
    ///     QuantityChange::plan(five, two),
    ///     Some(QuantityChange::SetAbsolute(two))
    /// );
    /// assert_eq!(QuantityChange::plan(two, two), None);
    /// ```
    #[must_use]
    pub fn plan(current: Quantity, target: Quantity) -> Option<Self> {
        match target.get().checked_sub(current.get()) {
            Some(0) => None,
            Some(delta) => Quantity::new(delta).ok().map(Self::AddDelta),
            None => Some(Self::SetAbsolute(target)),
        }
    }

    /// The quantity a line at `current` is expected to have after this write.
    ///
    /// Returns `None` on overflow.
    #[must_use]
    pub fn predict(self, current: Quantity) -> Option<Quantity> {
        match self {
            Self::AddDelta(delta) => current.checked_add(delta.get()),
            Self::SetAbsolute(target) => Some(target),
        }
    }
}
