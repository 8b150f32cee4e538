//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod color;
pub mod email;
pub mod id;
pub mod money;
pub mod quantity;
pub mod status;

pub use color::{HexColor, HexColorError};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
pub use quantity::{Quantity, QuantityError};
pub use status::*;
