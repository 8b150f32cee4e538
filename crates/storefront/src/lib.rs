//! Atelier storefront library.
//!
//! Catalog, cart and checkout over a pluggable store, served as a JSON API.
//! Built as a library so the router can be driven directly from tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
