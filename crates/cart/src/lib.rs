//! Storefront Cart - Cart reconciliation against the remote cart store.
//!
//! Keeps the cart shown to a shopper consistent with the cart the store
//! holds. Writes are applied optimistically and then reconciled by re-reading
//! the authoritative cart.
//!
//! # Modules
//!
//! - [`config`] - Environment-driven configuration for the store client
//! - [`error`] - Error type and Sentry helpers
//! - [`reconciler`] - [`CartReconciler`], the per-screen cart state machine
//! - [`store`] - The [`CartStore`] trait with HTTP and in-memory backends

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod reconciler;
pub mod store;

pub use config::{CartConfig, CartStoreConfig, ConfigError};
pub use error::{CartError, Result};
pub use reconciler::CartReconciler;
pub use store::{CartStore, HttpCartStore, MemoryCartStore, StoreError};
