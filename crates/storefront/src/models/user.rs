//! Account domain types.

use chrono::{DateTime, Utc};

use techshop_core::{CustomerId, Email, UserId, Username};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

/// Shop-side profile attached to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: UserId,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Validated registration data.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub password_hash: String,
}
