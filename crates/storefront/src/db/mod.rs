//! Database operations for the storefront `PostgreSQL` database.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `category`, `product` - Catalog
//! - `category_feature`, `product_feature`, `feature_validator` - Per-category specs
//! - `user`, `user_password`, `customer` - Accounts
//! - `cart`, `cart_product` - Shopping carts and their line items
//! - `order` - Placed orders
//!
//! Sessions live in `tower_sessions.session`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p techshop-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database.

pub mod carts;
pub mod catalog;
pub mod customers;
pub mod features;
pub mod orders;
pub mod seed;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use catalog::CatalogRepository;
pub use customers::CustomerRepository;
pub use features::FeatureRepository;
pub use orders::OrderRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(ConflictKind),
}

/// Which rule a rejected write ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictKind {
    /// Another account has the username.
    #[error("username already exists")]
    Username,
    /// Another account has the email.
    #[error("email already exists")]
    Email,
    /// Some other unique account field.
    #[error("account already exists")]
    Account,
    /// The cart has already been turned into an order.
    #[error("cart is already ordered")]
    CartOrdered,
    /// The cart has no lines.
    #[error("cart is empty")]
    CartEmpty,
    /// A line quantity does not fit the column.
    #[error("quantity is too large")]
    Quantity,
}

impl RepositoryError {
    /// Wrap a value that failed to parse after being read from the database.
    pub(crate) fn corrupt(what: &str, err: impl std::fmt::Display) -> Self {
        Self::DataCorruption(format!("invalid {what} in database: {err}"))
    }
}

/// Convert a non-negative count column to `u32`.
pub(crate) fn count_to_u32(what: &str, value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|e| RepositoryError::corrupt(what, e))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_message() {
        let err = RepositoryError::corrupt("slug", "bad char");
        assert_eq!(
            err.to_string(),
            "data corruption: invalid slug in database: bad char"
        );
    }

    #[test]
    fn test_count_to_u32() {
        assert_eq!(count_to_u32("qty", 3).ok(), Some(3));
        assert!(matches!(
            count_to_u32("qty", -1),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
