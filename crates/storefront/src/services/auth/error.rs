//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::form::FormErrors;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Registration form failed validation.
    #[error("invalid registration: {0}")]
    Validation(FormErrors),

    /// Invalid credentials (wrong password or unknown username).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Account row is missing for a logged-in session.
    #[error("user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
