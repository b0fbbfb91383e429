//! Cart route handlers.
//!
//! Every cart action redirects back to the cart page with a flash message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CurrentCart, Flashes, OptionalAuth, push_flash};
use crate::models::{Cart, CartError, Flash};
use crate::routes::{PageContext, parse_slug};
use crate::services::{CartService, CartServiceError};
use crate::state::AppState;

const CART_PATH: &str = "/cart/";

/// Change quantity form data.
#[derive(Debug, Deserialize)]
pub struct ChangeQtyForm {
    #[serde(default)]
    pub qty: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: Cart,
}

/// Display cart page.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    CurrentCart(cart): CurrentCart,
    flashes: Flashes,
) -> Result<CartShowTemplate> {
    Ok(CartShowTemplate {
        page: PageContext::load(&state, user, &cart, flashes).await?,
        cart,
    })
}

/// Add a product to the cart.
///
/// Adding a product that is already in the cart leaves its quantity alone.
#[instrument(skip(state, session, cart))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    CurrentCart(mut cart): CurrentCart,
) -> Result<Redirect> {
    let slug = parse_slug(&slug)?;
    let outcome = CartService::new(state.pool())
        .add(&session, &mut cart, &slug)
        .await;
    let flash = cart_flash(outcome, "Product added to cart")?;

    add_breadcrumb("cart", "Added product", Some(&[("product", slug.as_str())]));
    push_flash(&session, flash).await?;
    Ok(Redirect::to(CART_PATH))
}

/// Remove a product from the cart.
#[instrument(skip(state, session, cart))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    CurrentCart(mut cart): CurrentCart,
) -> Result<Redirect> {
    let slug = parse_slug(&slug)?;
    let outcome = CartService::new(state.pool()).remove(&mut cart, &slug).await;
    let flash = cart_flash(outcome, "Product removed from cart")?;

    add_breadcrumb("cart", "Removed product", Some(&[("product", slug.as_str())]));
    push_flash(&session, flash).await?;
    Ok(Redirect::to(CART_PATH))
}

/// Set the quantity of a product in the cart.
#[instrument(skip(state, session, cart, form))]
pub async fn change_qty(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    CurrentCart(mut cart): CurrentCart,
    Form(form): Form<ChangeQtyForm>,
) -> Result<Redirect> {
    let slug = parse_slug(&slug)?;

    let flash = match form.qty.trim().parse::<u32>() {
        Ok(qty) => {
            let outcome = CartService::new(state.pool())
                .change_qty(&mut cart, &slug, qty)
                .await;
            cart_flash(outcome, "Quantity updated")?
        }
        Err(_) => Flash::error(rejection_message(&CartError::InvalidQuantity)),
    };

    push_flash(&session, flash).await?;
    Ok(Redirect::to(CART_PATH))
}

/// Turn the outcome of a cart action into the flash shown on the cart page.
///
/// Rejections by the cart become error flashes; other failures propagate.
fn cart_flash<T>(
    outcome: std::result::Result<T, CartServiceError>,
    success: &str,
) -> Result<Flash> {
    match outcome {
        Ok(_) => Ok(Flash::success(success)),
        Err(CartServiceError::Cart(err)) => {
            tracing::debug!(error = %err, "Cart action rejected");
            Ok(Flash::error(rejection_message(&err)))
        }
        Err(err) => Err(err.into()),
    }
}

const fn rejection_message(err: &CartError) -> &'static str {
    match err {
        CartError::NotInCart => "That product is not in your cart",
        CartError::InvalidQuantity => "Quantity must be a whole number of at least 1",
        CartError::Frozen => "This cart has already been ordered",
        CartError::Empty => "Your cart is empty",
        CartError::TooLarge => "That quantity would take the cart over the maximum order total",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use techshop_core::Slug;

    use super::*;
    use crate::models::FlashLevel;

    #[test]
    fn test_cart_flash_success() {
        let flash = cart_flash(Ok(()), "Product added to cart").unwrap();
        assert_eq!(flash.level, FlashLevel::Success);
        assert_eq!(flash.message, "Product added to cart");
    }

    #[test]
    fn test_cart_flash_rejection_becomes_error_flash() {
        let outcome: std::result::Result<(), _> = Err(CartServiceError::Cart(CartError::NotInCart));
        let flash = cart_flash(outcome, "unused").unwrap();
        assert_eq!(flash.level, FlashLevel::Error);
        assert_eq!(flash.message, "That product is not in your cart");
    }

    #[test]
    fn test_cart_flash_missing_product_propagates() {
        let outcome: std::result::Result<(), _> = Err(CartServiceError::ProductNotFound(
            Slug::parse("ghost").unwrap(),
        ));
        assert!(cart_flash(outcome, "unused").is_err());
    }

    #[test]
    fn test_oversized_quantity_becomes_error_flash() {
        let outcome: std::result::Result<(), _> = Err(CartServiceError::Cart(CartError::TooLarge));
        let flash = cart_flash(outcome, "unused").unwrap();
        assert_eq!(flash.level, FlashLevel::Error);
        assert!(flash.message.contains("maximum order total"));
    }
}
