//! Customer profile repository.

use sqlx::PgPool;

use techshop_core::{CustomerId, UserId};

use super::RepositoryError;
use crate::models::Customer;

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    user_id: UserId,
    phone: Option<String>,
    address: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            phone: row.phone,
            address: row.address,
        }
    }
}

/// Repository for customer profiles.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the customer profile of a user, creating an empty one if missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create_for_user(&self, user: UserId) -> Result<Customer, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            INSERT INTO storefront.customer (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, phone, address
            ",
        )
        .bind(user)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get the customer profile of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(&self, user: UserId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, user_id, phone, address FROM storefront.customer WHERE user_id = $1",
        )
        .bind(user)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }
}
