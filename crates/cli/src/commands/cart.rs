//! Cart command handlers.
//!
//! Each command loads the owner's cart first so the reconciler can validate
//! the request against the current lines, then prints the reconciled cart.

use dialoguer::{Confirm, theme::ColorfulTheme};
use rust_decimal::Decimal;
use storefront_cart::{CartError, CartReconciler, CartStore, CartStoreConfig, HttpCartStore};
use storefront_cart_core::{Cart, OwnerId, Price, ProductId, ProductSnapshot, Quantity};

use super::{CliError, format};

/// One owner's cart, for the lifetime of a command.
pub struct CartSession<S> {
    reconciler: CartReconciler<S>,
    owner: OwnerId,
}

impl CartSession<HttpCartStore> {
    /// Build an HTTP-backed session.
    pub fn connect(config: CartStoreConfig, owner: OwnerId) -> Result<Self, CliError> {
        let store = HttpCartStore::new(config)?;
        Ok(Self::new(store, owner))
    }
}

impl<S: CartStore> CartSession<S> {
    pub const fn new(store: S, owner: OwnerId) -> Self {
        Self {
            reconciler: CartReconciler::new(store),
            owner,
        }
    }

    pub async fn show(&mut self) -> Result<(), CliError> {
        let cart = self.reconciler.load(&self.owner).await?;
        print_cart(&cart);
        Ok(())
    }

    pub async fn add(
        &mut self,
        product_id: ProductId,
        name: String,
        price: Decimal,
        image: String,
        quantity: Quantity,
    ) -> Result<(), CliError> {
        let unit_price =
            Price::new(price).map_err(|e| CartError::InvalidOperation(e.to_string()))?;
        let product = ProductSnapshot {
            product_id,
            display_name: name,
            unit_price,
            image_ref: image,
        };

        let cart = self
            .reconciler
            .add_product(&self.owner, &product, quantity)
            .await?;
        print_cart(&cart);
        Ok(())
    }

    pub async fn increment(&mut self, product_id: &ProductId) -> Result<(), CliError> {
        self.reconciler.load(&self.owner).await?;
        let cart = self.reconciler.increment(&self.owner, product_id).await?;
        print_cart(&cart);
        Ok(())
    }

    pub async fn decrement(&mut self, product_id: &ProductId) -> Result<(), CliError> {
        self.reconciler.load(&self.owner).await?;
        let cart = self.reconciler.decrement(&self.owner, product_id).await?;
        print_cart(&cart);
        Ok(())
    }

    pub async fn set_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<(), CliError> {
        self.reconciler.load(&self.owner).await?;
        let cart = self
            .reconciler
            .set_quantity(&self.owner, product_id, quantity)
            .await?;
        print_cart(&cart);
        Ok(())
    }

    pub async fn remove(&mut self, product_id: &ProductId, yes: bool) -> Result<(), CliError> {
        let cart = self.reconciler.load(&self.owner).await?;
        let Some(line) = cart.line(product_id) else {
            // Let the reconciler reject it with the usual error
            self.reconciler.remove(&self.owner, product_id).await?;
            return Ok(());
        };

        let prompt = format!("Remove {} from the cart?", line.display_name);
        if !yes && !confirm(&prompt)? {
            print_cancelled();
            return Ok(());
        }

        let cart = self.reconciler.remove(&self.owner, product_id).await?;
        print_cart(&cart);
        Ok(())
    }

    pub async fn clear(&mut self, yes: bool) -> Result<(), CliError> {
        if !yes && !confirm("Remove every item from the cart?")? {
            print_cancelled();
            return Ok(());
        }

        let cart = self.reconciler.clear(&self.owner).await?;
        print_cart(&cart);
        Ok(())
    }

    #[cfg(test)]
    pub const fn store(&self) -> &S {
        self.reconciler.store()
    }
}

fn confirm(prompt: &str) -> Result<bool, CliError> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &Cart) {
    print!("{}", format::cart_table(cart));
}

#[allow(clippy::print_stdout)]
fn print_cancelled() {
    println!("Cancelled.");
}
