//! Authentication service.
//!
//! Username/password accounts with argon2id hashes. Registration creates the
//! account, its password and its customer profile together.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;

use techshop_core::{Email, EmailError, UserId, Username, UsernameError};

use crate::db::{ConflictKind, RepositoryError, UserRepository};
use crate::models::{Customer, NewUser, User};
use crate::services::form::{FormErrors, optional_text};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Longest name accepted for first and last name.
const MAX_NAME_LENGTH: usize = 150;
/// Matches `storefront.customer.phone`.
const MAX_PHONE_LENGTH: usize = 20;
/// Matches `storefront.customer.address`.
const MAX_ADDRESS_LENGTH: usize = 255;

/// Raw registration form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Registration input that passed the offline checks.
#[derive(Debug, Clone)]
pub struct ValidRegistration {
    pub username: Username,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Check a registration form without touching the database.
///
/// Every problem is reported, not just the first one.
///
/// # Errors
///
/// Returns the collected field errors if any check fails.
pub fn validate_registration<S: AsRef<str>>(
    input: &RegistrationInput,
    blocked_domains: &[S],
) -> Result<ValidRegistration, FormErrors> {
    let mut errors = FormErrors::new();

    let username = match Username::parse(&input.username) {
        Ok(username) => Some(username),
        Err(e) => {
            errors.add("username", username_message(&e));
            None
        }
    };

    let email = match Email::parse(&input.email) {
        Ok(email) if email.has_domain_in(blocked_domains) => {
            errors.add(
                "email",
                format!("Registration from {} is not allowed", email.domain()),
            );
            None
        }
        Ok(email) => Some(email),
        Err(e) => {
            errors.add("email", email_message(&e));
            None
        }
    };

    let first_name = input.first_name.trim().to_owned();
    let last_name = input.last_name.trim().to_owned();
    for (field, value) in [("first_name", &first_name), ("last_name", &last_name)] {
        if value.chars().count() > MAX_NAME_LENGTH {
            errors.add(field, format!("Must be at most {MAX_NAME_LENGTH} characters"));
        }
    }

    let phone = optional_text(&input.phone);
    if let Some(phone) = &phone
        && !is_valid_phone(phone, MAX_PHONE_LENGTH)
    {
        errors.add(
            "phone",
            format!("Use at most {MAX_PHONE_LENGTH} digits, spaces and + - ( )"),
        );
    }

    let address = optional_text(&input.address);
    if address
        .as_ref()
        .is_some_and(|a| a.chars().count() > MAX_ADDRESS_LENGTH)
    {
        errors.add(
            "address",
            format!("Must be at most {MAX_ADDRESS_LENGTH} characters"),
        );
    }

    if let Err(message) = validate_password(&input.password) {
        errors.add("password", message);
    }
    if input.password != input.confirm_password {
        errors.add("confirm_password", "Passwords do not match");
    }

    match (username, email) {
        (Some(username), Some(email)) if errors.is_empty() => Ok(ValidRegistration {
            username,
            email,
            first_name,
            last_name,
            phone,
            address,
        }),
        _ => Err(errors),
    }
}

/// Whether a phone number is non-empty, short enough and uses only
/// digits, spaces and `+-()`.
#[must_use]
pub fn is_valid_phone(phone: &str, max_len: usize) -> bool {
    !phone.is_empty()
        && phone.chars().count() <= max_len
        && phone.chars().any(|c| c.is_ascii_digit())
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
}

fn username_message(err: &UsernameError) -> String {
    match err {
        UsernameError::Empty => "Username is required".to_owned(),
        UsernameError::TooLong { max } => format!("Username must be at most {max} characters"),
        UsernameError::InvalidCharacter(_) => {
            "Username may contain only letters, digits and @ . + - _".to_owned()
        }
    }
}

fn email_message(err: &EmailError) -> String {
    match err {
        EmailError::Empty => "Email is required".to_owned(),
        _ => "Enter a valid email address".to_owned(),
    }
}

/// Authentication service.
///
/// Handles user registration and password login.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    blocked_domains: &'a [String],
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, blocked_domains: &'a [String]) -> Self {
        Self {
            users: UserRepository::new(pool),
            blocked_domains,
        }
    }

    /// Register a new account with its customer profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the form is invalid or the username
    /// or email is taken. Returns `AuthError::PasswordHash` if hashing fails.
    pub async fn register(&self, input: &RegistrationInput) -> Result<(User, Customer), AuthError> {
        let valid =
            validate_registration(input, self.blocked_domains).map_err(AuthError::Validation)?;

        let mut errors = FormErrors::new();
        if self.users.username_exists(&valid.username).await? {
            errors.add("username", "A user with that username already exists");
        }
        if self.users.email_exists(&valid.email).await? {
            errors.add("email", "This email is already registered");
        }
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let password_hash = hash_password(&input.password)?;
        let new_user = NewUser {
            username: valid.username,
            email: valid.email,
            first_name: valid.first_name,
            last_name: valid.last_name,
            phone: valid.phone,
            address: valid.address,
            password_hash,
        };

        // The unique indexes still catch a registration racing this one.
        self.users
            .create_with_customer(&new_user)
            .await
            .map_err(registration_conflict)
    }

    /// Authenticate with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username is unknown or
    /// the password does not match.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = Username::parse(username).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .get_by_username(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = self
            .users
            .get_password_hash(user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Turn a unique-index violation at insert time into a form error.
fn registration_conflict(err: RepositoryError) -> AuthError {
    let field = match err {
        RepositoryError::Conflict(ConflictKind::Email) => "email",
        RepositoryError::Conflict(ConflictKind::Username | ConflictKind::Account) => "username",
        other => return AuthError::Repository(other),
    };
    let mut errors = FormErrors::new();
    errors.add(field, "Already registered");
    AuthError::Validation(errors)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BLOCKED: [&str; 2] = ["mailinator.com", "guerrillamail.com"];

    fn input() -> RegistrationInput {
        RegistrationInput {
            username: "ann_smith".to_owned(),
            email: "ann@example.com".to_owned(),
            first_name: "Ann".to_owned(),
            last_name: "Smith".to_owned(),
            phone: "+1 (555) 010-2030".to_owned(),
            address: "1 Main St".to_owned(),
            password: "correct horse".to_owned(),
            confirm_password: "correct horse".to_owned(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let valid = validate_registration(&input(), &BLOCKED).unwrap();
        assert_eq!(valid.username.as_str(), "ann_smith");
        assert_eq!(valid.phone.as_deref(), Some("+1 (555) 010-2030"));
    }

    #[test]
    fn test_blank_optional_fields_become_none() {
        let mut form = input();
        form.phone = "  ".to_owned();
        form.address = String::new();
        let valid = validate_registration(&form, &BLOCKED).unwrap();
        assert_eq!(valid.phone, None);
        assert_eq!(valid.address, None);
    }

    #[test]
    fn test_password_mismatch_and_length() {
        let mut form = input();
        form.password = "short".to_owned();
        form.confirm_password = "shorter".to_owned();
        let errors = validate_registration(&form, &BLOCKED).unwrap_err();
        assert_eq!(
            errors.first("password"),
            Some("Password must be at least 8 characters")
        );
        assert_eq!(
            errors.first("confirm_password"),
            Some("Passwords do not match")
        );
    }

    #[test]
    fn test_blocked_email_domain() {
        let mut form = input();
        form.email = "bot@MAILINATOR.com".to_owned();
        let errors = validate_registration(&form, &BLOCKED).unwrap_err();
        assert_eq!(
            errors.first("email"),
            Some("Registration from mailinator.com is not allowed")
        );
    }

    #[test]
    fn test_invalid_username_and_email() {
        let mut form = input();
        form.username = "ann smith".to_owned();
        form.email = "not-an-email".to_owned();
        let errors = validate_registration(&form, &BLOCKED).unwrap_err();
        assert!(errors.has("username"));
        assert_eq!(errors.first("email"), Some("Enter a valid email address"));
    }

    #[test]
    fn test_phone_rules() {
        assert!(is_valid_phone("+7 (999) 123-45-67", 20));
        assert!(!is_valid_phone("call me", 20));
        assert!(!is_valid_phone("+-()", 20));
        assert!(!is_valid_phone("123456789012345678901", 20));
        assert!(!is_valid_phone("", 20));
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("password123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("password123", &hash).is_ok());
        assert!(matches!(
            verify_password("password124", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password("password123", "not a phc string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_registration_conflict_targets_field() {
        let AuthError::Validation(errors) =
            registration_conflict(RepositoryError::Conflict(ConflictKind::Email))
        else {
            panic!("expected a validation error");
        };
        assert_eq!(errors.first("email"), Some("Already registered"));
        assert!(!errors.has("username"));

        let AuthError::Validation(errors) =
            registration_conflict(RepositoryError::Conflict(ConflictKind::Username))
        else {
            panic!("expected a validation error");
        };
        assert_eq!(errors.first("username"), Some("Already registered"));

        assert!(matches!(
            registration_conflict(RepositoryError::NotFound),
            AuthError::Repository(RepositoryError::NotFound)
        ));
    }
}
