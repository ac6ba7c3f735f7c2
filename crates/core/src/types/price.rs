//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are exact decimals so a cart total can be compared to the sum of
//! its lines with `==`. Arithmetic is checked: amounts come from remote
//! documents and may be arbitrarily large.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::quantity::Quantity;

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
}

/// A non-negative monetary amount in the store currency.
///
/// ## Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use storefront_cart_core::{Price, Quantity};
///
/// let unit = Price::new(Decimal::from(10_000)).unwrap();
/// let line = unit.checked_times(Quantity::new(3).unwrap()).unwrap();
/// assert_eq!(line.amount(), Decimal::from(30_000));
///
/// assert!(Price::new(Decimal::from(-1)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount.normalize()))
    }

    /// Create a price from a whole number of currency units.
    #[must_use]
    pub fn from_units(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The line amount for `quantity` units at this price, or `None` on
    /// overflow.
    #[must_use]
    pub fn checked_times(self, quantity: Quantity) -> Option<Self> {
        self.0
            .checked_mul(Decimal::from(quantity.get()))
            .map(|amount| Self(amount.normalize()))
    }

    /// `self + rhs`, or `None` on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0
            .checked_add(rhs.0)
            .map(|amount| Self(amount.normalize()))
    }

    /// Sum of `prices`, or `None` on overflow.
    pub fn checked_sum<I>(prices: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        prices
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
