//! Storefront Cart Core - Shared types library.
//!
//! This crate provides the types used across the cart components:
//! - `cart` - Cart reconciliation against the remote cart store
//! - `cli` - Terminal front end for inspecting and editing a cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, quantities, cart values and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
