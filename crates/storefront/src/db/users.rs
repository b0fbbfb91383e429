//! User repository for database operations.
//!
//! Accounts span three tables: `user`, `user_password` and `customer`.
//! Registration writes all three in one transaction.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use techshop_core::{CustomerId, Email, UserId, Username};

use super::{ConflictKind, RepositoryError};
use crate::models::{Customer, NewUser, User};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            username: Username::parse(&row.username)
                .map_err(|e| RepositoryError::corrupt("username", e))?,
            email: Email::parse(&row.email).map_err(|e| RepositoryError::corrupt("email", e))?,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
        })
    }
}

/// Unique index names from the accounts migration.
const USERNAME_KEY: &str = "user_username_key";
const EMAIL_KEY: &str = "user_email_key";

fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let kind = match db_err.constraint() {
            Some(USERNAME_KEY) => ConflictKind::Username,
            Some(EMAIL_KEY) => ConflictKind::Email,
            _ => ConflictKind::Account,
        };
        return RepositoryError::Conflict(kind);
    }
    RepositoryError::Database(e)
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by username, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if stored values are invalid.
    pub async fn get_by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, email, first_name, last_name, created_at
            FROM storefront.user
            WHERE LOWER(username) = LOWER($1)
            ",
        )
        .bind(username.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if stored values are invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, email, first_name, last_name, created_at
            FROM storefront.user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Whether a username is already registered, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn username_exists(&self, username: &Username) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM storefront.user WHERE LOWER(username) = LOWER($1))",
        )
        .bind(username.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Whether an email is already registered, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM storefront.user WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Get the password hash for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash: Option<String> = sqlx::query_scalar(
            "SELECT password_hash FROM storefront.user_password WHERE user_id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(hash)
    }

    /// Create a user with a password hash and a customer profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username or email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_customer(
        &self,
        new_user: &NewUser,
    ) -> Result<(User, Customer), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO storefront.user (username, email, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, first_name, last_name, created_at
            ",
        )
        .bind(new_user.username.as_str())
        .bind(new_user.email.as_str())
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        sqlx::query("INSERT INTO storefront.user_password (user_id, password_hash) VALUES ($1, $2)")
            .bind(row.id)
            .bind(&new_user.password_hash)
            .execute(&mut *tx)
            .await?;

        let customer_id: CustomerId = sqlx::query_scalar(
            r"
            INSERT INTO storefront.customer (user_id, phone, address)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(row.id)
        .bind(new_user.phone.as_deref())
        .bind(new_user.address.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let user = User::try_from(row)?;
        let customer = Customer {
            id: customer_id,
            user_id: user.id,
            phone: new_user.phone.clone(),
            address: new_user.address.clone(),
        };
        Ok((user, customer))
    }
}
