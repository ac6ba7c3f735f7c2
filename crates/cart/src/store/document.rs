//! Cart document wire format.
//!
//! The hosted database stores one document per owner under `carts/{owner}`.
//! Field names follow the database schema (`nama`, `harga`, `gambar`), and
//! amounts are JSON numbers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_cart_core::{Cart, CartId, CartLine, OwnerId, Price, ProductId, Quantity};

use super::StoreError;

/// A cart as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartDocument {
    pub user_id: String,
    #[serde(default)]
    pub items: Vec<CartItemDocument>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One line of a stored cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemDocument {
    pub product_id: String,
    /// Display name.
    pub nama: String,
    /// Unit price.
    #[serde(with = "rust_decimal::serde::float")]
    pub harga: Decimal,
    /// Image URL.
    #[serde(default)]
    pub gambar: String,
    pub quantity: u32,
}

impl CartDocument {
    /// Encode a cart, stamping `updated_at`.
    #[must_use]
    pub fn from_cart(cart: &Cart, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id: cart.owner_id().to_string(),
            items: cart.lines().iter().map(CartItemDocument::from).collect(),
            total: cart.total().amount(),
            updated_at: Some(updated_at),
        }
    }

    /// Decode into a cart owned by `owner`.
    ///
    /// Clients write `total` as a float sum, so it is compared with the line
    /// sum at cent precision. A match yields the exact line sum; anything
    /// else is kept as recorded and left for invariant checks to report.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidDocument`] for negative amounts, zero
    /// quantities, or lines whose total overflows.
    pub fn into_cart(self, owner: &OwnerId) -> Result<Cart, StoreError> {
        let lines = self
            .items
            .into_iter()
            .map(CartItemDocument::into_line)
            .collect::<Result<Vec<_>, _>>()?;

        let recorded = Price::new(self.total)
            .map_err(|e| StoreError::InvalidDocument(format!("total: {e}")))?;
        let cart = Cart::from_lines(CartId::for_owner(owner), owner.clone(), lines)
            .map_err(|e| StoreError::InvalidDocument(e.to_string()))?;

        if recorded.amount().round_dp(2) == cart.total().amount().round_dp(2) {
            return Ok(cart);
        }

        Ok(Cart::from_parts(
            cart.id().clone(),
            owner.clone(),
            cart.lines().to_vec(),
            recorded,
        ))
    }
}

impl CartItemDocument {
    fn into_line(self) -> Result<CartLine, StoreError> {
        let unit_price = Price::new(self.harga).map_err(|e| {
            StoreError::InvalidDocument(format!("item {}: {e}", self.product_id))
        })?;
        let quantity = Quantity::new(self.quantity).map_err(|e| {
            StoreError::InvalidDocument(format!("item {}: {e}", self.product_id))
        })?;

        Ok(CartLine {
            product_id: ProductId::from(self.product_id),
            display_name: self.nama,
            unit_price,
            image_ref: self.gambar,
            quantity,
        })
    }
}

impl From<&CartLine> for CartItemDocument {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.to_string(),
            nama: line.display_name.clone(),
            harga: line.unit_price.amount(),
            gambar: line.image_ref.clone(),
            quantity: line.quantity.get(),
        }
    }
}
