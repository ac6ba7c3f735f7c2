//! Cart error handling with Sentry integration.
//!
//! Remote failures are recoverable: the caller shows a notification and the
//! user may retry. Invariant violations point at a defect in the store or in
//! this crate and are captured to Sentry when they surface.

use storefront_cart_core::{CartInvariantError, OwnerId, ProductId};
use thiserror::Error;

use crate::store::StoreError;

/// Error type for cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The cart store could not be reached or rejected the call.
    #[error("Cart store unavailable: {0}")]
    RemoteUnavailable(#[from] StoreError),

    /// The operation does not apply to the current cart.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A cart value broke its invariants.
    #[error("Cart invariant violated: {0}")]
    InvariantViolated(#[from] CartInvariantError),
}

impl CartError {
    pub(crate) fn line_not_found(product_id: &ProductId) -> Self {
        Self::InvalidOperation(format!("no cart line for product {product_id}"))
    }

    pub(crate) fn not_loaded() -> Self {
        Self::InvalidOperation("cart has not been loaded".to_string())
    }

    pub(crate) fn owner_mismatch(loaded: &OwnerId, requested: &OwnerId) -> Self {
        Self::InvalidOperation(format!(
            "cart loaded for owner {loaded}, operation requested for {requested}"
        ))
    }

    /// Whether retrying the same operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteUnavailable(err) => !matches!(
                err,
                StoreError::NotFound(_)
                    | StoreError::InvalidDocument(_)
                    | StoreError::QuantityOverflow(_)
            ),
            Self::InvalidOperation(_) | Self::InvariantViolated(_) => false,
        }
    }

    /// Short message suitable for showing to the shopper.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::RemoteUnavailable(_) => "Could not reach the cart. Please try again.",
            Self::InvalidOperation(_) => "That action is not available for this cart.",
            Self::InvariantViolated(_) => "Something went wrong with your cart.",
        }
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Add a breadcrumb for a cart action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user
/// actions leading up to an error.
pub fn add_breadcrumb(message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some("cart".to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

/// Report an invariant violation and convert it into a [`CartError`].
pub(crate) fn report_invariant(owner: &OwnerId, err: CartInvariantError) -> CartError {
    let err = CartError::InvariantViolated(err);
    let event_id = sentry::capture_error(&err);
    tracing::error!(
        error = %err,
        owner = %owner,
        sentry_event_id = %event_id,
        "Cart invariant violated"
    );
    err
}

#[cfg(test)]
mod tests {
    use storefront_cart_core::Price;

    use super::*;

    #[test]
    fn test_cart_error_display() {
        let err = CartError::line_not_found(&ProductId::new("p-1"));
        assert_eq!(err.to_string(), "Invalid operation: no cart line for product p-1");

        let err = CartError::from(StoreError::Unavailable("timeout".to_string()));
        assert_eq!(
            err.to_string(),
            "Cart store unavailable: Store unavailable: timeout"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(CartError::from(StoreError::Unavailable("x".to_string())).is_retryable());
        assert!(CartError::from(StoreError::RateLimited(5)).is_retryable());
        assert!(!CartError::from(StoreError::NotFound("x".to_string())).is_retryable());
        assert!(!CartError::not_loaded().is_retryable());

        let invariant = CartInvariantError::TotalMismatch {
            recorded: Price::ZERO,
            expected: Price::from_units(1),
        };
        assert!(!CartError::from(invariant).is_retryable());
    }

    #[test]
    fn test_report_invariant_without_sentry_client() {
        let err = report_invariant(
            &OwnerId::new("uid-1"),
            CartInvariantError::DuplicateLine(ProductId::new("a")),
        );
        assert!(matches!(err, CartError::InvariantViolated(_)));
    }
}
