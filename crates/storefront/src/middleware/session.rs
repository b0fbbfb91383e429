//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The session
//! cookie is signed with a key derived from `STOREFRONT_SESSION_SECRET`.

use argon2::Argon2;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "ts_session";

/// Days of inactivity after which a session expires.
pub const SESSION_EXPIRY_DAYS: i64 = 7;

const SESSION_EXPIRY_SECONDS: i64 = SESSION_EXPIRY_DAYS * 24 * 60 * 60;

/// Fixed salt for the cookie key derivation.
const KEY_SALT: &[u8] = b"techshop.session-cookie.v1";

/// Error deriving the cookie signing key.
#[derive(Debug, Error)]
pub enum SessionKeyError {
    #[error("key derivation failed: {0}")]
    Derive(argon2::Error),
    #[error("derived key rejected: {0}")]
    Key(#[from] tower_sessions::cookie::KeyError),
}

/// Derive the 64-byte cookie signing key from the session secret.
///
/// # Errors
///
/// Returns `SessionKeyError` if argon2 rejects its parameters.
pub fn derive_cookie_key(secret: &SecretString) -> Result<Key, SessionKeyError> {
    let mut material = [0u8; 64];
    Argon2::default()
        .hash_password_into(secret.expose_secret().as_bytes(), KEY_SALT, &mut material)
        .map_err(SessionKeyError::Derive)?;
    Ok(Key::try_from(material.as_slice())?)
}

/// Create the session layer with `PostgreSQL` store.
///
/// # Arguments
///
/// * `pool` - `PostgreSQL` connection pool
/// * `config` - Storefront configuration (for session secret)
///
/// # Errors
///
/// Returns `SessionKeyError` if the signing key cannot be derived.
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<PostgresStore, SignedCookie>, SessionKeyError> {
    // The session table is created by the first migration.
    let store = PostgresStore::new(pool.clone());
    let key = derive_cookie_key(&config.session_secret)?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_cookie_key_is_deterministic() {
        let secret = SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6q");
        let first = derive_cookie_key(&secret).unwrap();
        let second = derive_cookie_key(&secret).unwrap();
        assert_eq!(first.master(), second.master());

        let other = derive_cookie_key(&SecretString::from("zZ9!yY8@xX7#wW6$vV5%uU4^tT3&sS2*")).unwrap();
        assert_ne!(first.master(), other.master());
    }
}
