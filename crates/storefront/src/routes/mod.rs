//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET  /                          - Home page (latest products per category)
//! GET  /products/{slug}/          - Product detail with specification table
//! GET  /category/{slug}/          - Category listing, ?<feature>=<value> filters
//!
//! # Cart
//! GET  /cart/                     - Cart page
//! GET  /add-to-cart/{slug}/       - Add product, redirect to /cart/
//! GET  /remove-from-cart/{slug}/  - Remove product, redirect to /cart/
//! POST /change-qty/{slug}/        - Set quantity, redirect to /cart/
//!
//! # Checkout
//! GET  /checkout/                 - Order form
//! POST /make-order/               - Place order (requires auth)
//!
//! # Accounts
//! GET  /login/                    - Login page
//! POST /login/                    - Login action (rate limited)
//! GET  /logout/                   - Logout, redirect to /
//! GET  /registration/             - Registration page
//! POST /registration/             - Registration action (rate limited)
//! GET  /profile/                  - Order history (requires auth)
//! ```
//!
//! Paths are registered without the trailing slash; `main` trims it from
//! incoming requests so both spellings resolve.

pub mod account;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod home;
pub mod products;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use techshop_core::{Money, Slug};

use crate::error::AppError;
use crate::middleware::{Flashes, auth_rate_limiter};
use crate::models::{Cart, CategorySummary, CurrentUser, Flash};
use crate::state::AppState;

/// Data shared by every full page: sidebar, visitor, cart badge and flashes.
pub struct PageContext {
    pub categories: Arc<[CategorySummary]>,
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub cart_total: Money,
    pub flashes: Vec<Flash>,
}

impl PageContext {
    /// Collect the page chrome for a request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the sidebar cannot be loaded.
    pub async fn load(
        state: &AppState,
        user: Option<CurrentUser>,
        cart: &Cart,
        Flashes(flashes): Flashes,
    ) -> Result<Self, AppError> {
        Ok(Self {
            categories: state.sidebar_categories().await?,
            user,
            cart_count: cart.total_products,
            cart_total: cart.final_price,
            flashes,
        })
    }

    /// Whether a visitor is logged in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Parse a slug path segment, treating malformed slugs as missing pages.
pub(crate) fn parse_slug(raw: &str) -> Result<Slug, AppError> {
    Slug::parse(raw).map_err(|_| AppError::NotFound(format!("slug {raw}")))
}

/// Login and registration submissions, behind the auth rate limiter.
fn auth_submissions() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/registration", post(auth::register))
        .layer(auth_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/", get(home::home))
        .route("/products/{slug}", get(products::show))
        .route("/category/{slug}", get(categories::show))
        // Cart
        .route("/cart", get(cart::show))
        .route("/add-to-cart/{slug}", get(cart::add))
        .route("/remove-from-cart/{slug}", get(cart::remove))
        .route("/change-qty/{slug}", post(cart::change_qty))
        // Checkout
        .route("/checkout", get(checkout::show))
        .route("/make-order", post(checkout::make_order))
        // Accounts
        .route("/login", get(auth::login_page))
        .route("/logout", get(auth::logout))
        .route("/registration", get(auth::registration_page))
        .route("/profile", get(account::profile))
        .merge(auth_submissions())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slug_maps_to_not_found() {
        assert!(parse_slug("notebooks").is_ok());
        assert!(matches!(
            parse_slug("Not A Slug"),
            Err(AppError::NotFound(_))
        ));
    }
}
