//! Cart commands.

mod cart;
mod format;

pub use cart::CartSession;

use storefront_cart::{CartError, ConfigError, StoreError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No owner given and `CART_OWNER_ID` is unset.
    #[error("No cart owner: pass --owner or set CART_OWNER_ID")]
    MissingOwner,

    /// The store client could not be built.
    #[error("Store client error: {0}")]
    Store(#[from] StoreError),

    /// A cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Reading the confirmation prompt failed.
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// Print a short failure message for the terminal user.
#[allow(clippy::print_stderr)]
pub fn report_failure(err: &CliError) {
    match err {
        CliError::Cart(e) => {
            eprintln!("{}", e.user_message());
            if e.is_retryable() {
                eprintln!("Run `cart-cli show` to see the current cart.");
            }
        }
        other => eprintln!("{other}"),
    }
}
