//! Caller identity as asserted by the upstream auth gateway.

use serde::{Deserialize, Serialize};

use atelier_core::UserId;

/// What the caller is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A shopper; sees only their own cart and orders.
    #[default]
    Customer,
    /// Store staff; sees all orders and manages the catalog.
    Admin,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            other => Err(format!("invalid role: {other}")),
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: UserId,
    pub role: Role,
}

impl CurrentUser {
    /// A customer identity.
    #[must_use]
    pub const fn customer(id: UserId) -> Self {
        Self {
            id,
            role: Role::Customer,
        }
    }

    /// An admin identity.
    #[must_use]
    pub const fn admin(id: UserId) -> Self {
        Self {
            id,
            role: Role::Admin,
        }
    }

    /// Whether the caller has admin rights.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}
