//! Atelier Core - Shared domain types.
//!
//! This crate provides the value types used across all Atelier components:
//! - `storefront` - Cart, checkout and order API (plus catalog administration)
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. Database encoding is opt-in via the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, money, quantities, emails, colors and order status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
