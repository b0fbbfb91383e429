//! Integration tests for TechShop.
//!
//! # Running Tests
//!
//! The tests drive a running storefront over HTTP and expect the sample
//! catalog to be loaded:
//!
//! ```bash
//! cargo run -p techshop-cli -- migrate
//! cargo run -p techshop-cli -- seed catalog crates/cli/seed/catalog.yaml
//! cargo run -p techshop-storefront &
//! cargo test -p techshop-integration-tests -- --ignored
//! ```
//!
//! Set `STOREFRONT_BASE_URL` to target a server other than
//! `http://localhost:3000`. Login and registration are rate limited per
//! client IP, so run the suites one at a time against a fresh server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use reqwest::{Client, Response, redirect};
use uuid::Uuid;

/// A notebook from the sample catalog.
pub const NOTEBOOK: &str = "asus-zenbook-14-oled";
/// Its title as rendered on pages.
pub const NOTEBOOK_TITLE: &str = "Asus ZenBook 14 OLED";
/// A second notebook with different features.
pub const OTHER_NOTEBOOK_TITLE: &str = "Lenovo IdeaPad 5 15";
/// A smartphone from the sample catalog.
pub const PHONE: &str = "samsung-galaxy-s24";

/// Password used for accounts created by the tests.
pub const PASSWORD: &str = "correct-horse-battery";

/// Base URL for the storefront (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A fresh visitor: its own cookie jar, following redirects.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn visitor() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A fresh visitor that does not follow redirects.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn visitor_without_redirects() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// A username no other test run has used.
#[must_use]
pub fn unique_username() -> String {
    format!("it_{}", Uuid::new_v4().simple())
}

/// GET a storefront path.
///
/// # Panics
///
/// Panics if the request cannot be sent.
pub async fn get(client: &Client, path: &str) -> Response {
    client
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .unwrap_or_else(|e| panic!("GET {path} failed: {e}"))
}

/// POST a form to a storefront path.
///
/// # Panics
///
/// Panics if the request cannot be sent.
pub async fn post_form(client: &Client, path: &str, form: &[(&str, &str)]) -> Response {
    client
        .post(format!("{}{path}", base_url()))
        .form(form)
        .send()
        .await
        .unwrap_or_else(|e| panic!("POST {path} failed: {e}"))
}

/// Read a response body.
///
/// # Panics
///
/// Panics if the body cannot be read.
pub async fn body(response: Response) -> String {
    response.text().await.expect("Failed to read response body")
}

/// Register a new account and stay logged in. Returns the username.
///
/// # Panics
///
/// Panics if the registration is rejected.
pub async fn register(client: &Client) -> String {
    let username = unique_username();
    let email = format!("{username}@example.com");

    let response = post_form(
        client,
        "/registration/",
        &[
            ("username", &username),
            ("email", &email),
            ("first_name", "Integration"),
            ("last_name", "Tester"),
            ("phone", "+1 555 0100"),
            ("address", "1 Test Street"),
            ("password", PASSWORD),
            ("confirm_password", PASSWORD),
        ],
    )
    .await;

    let page = body(response).await;
    assert!(
        page.contains("Registration complete"),
        "registration failed for {username}"
    );
    username
}
