//! `PostgreSQL` store.
//!
//! Queries are checked at runtime (`query_as::<_, Row>`) so the crate builds
//! without a live database. Each table has a private row struct that is
//! converted into the domain model, surfacing bad stored values as
//! [`RepositoryError::DataCorruption`].

mod cart;
mod catalog;
mod orders;

use sqlx::PgPool;

use super::{CommerceStore, RepositoryError};

/// Storage backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl CommerceStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
