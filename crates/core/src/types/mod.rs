//! Core cart types.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod change;
pub mod id;
pub mod price;
pub mod quantity;
pub mod status;

pub use cart::{Cart, CartInvariantError, CartLine, ProductSnapshot};
pub use change::QuantityChange;
pub use id::*;
pub use price::{Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use status::*;
