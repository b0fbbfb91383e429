//! Cart service: resolves the visitor's cart and applies cart actions.

use chrono::TimeDelta;
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use techshop_core::{CartId, Slug};

use crate::db::{CartRepository, CatalogRepository, CustomerRepository, RepositoryError};
use crate::models::{Cart, CartChange, CartError, CurrentUser, LineProduct, Product, session_keys};

/// Errors from cart actions.
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// No product has the requested slug.
    #[error("product not found: {0}")]
    ProductNotFound(Slug),

    /// The cart rejected the change.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Session store error.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl From<&Product> for LineProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            slug: product.slug.clone(),
            title: product.title.clone(),
            image_url: product.image_url.clone(),
            price: product.price,
        }
    }
}

/// Cart service.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    customers: CustomerRepository<'a>,
    catalog: CatalogRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
            customers: CustomerRepository::new(pool),
            catalog: CatalogRepository::new(pool),
        }
    }

    /// Get the visitor's open cart.
    ///
    /// Logged-in users get their customer's open cart, created if needed.
    /// Anonymous visitors get the cart whose id is kept in their session.
    /// Without one they get an unsaved empty cart, and nothing is written
    /// until they add a product.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` or `CartServiceError::Session`
    /// if loading or storing fails.
    #[instrument(skip(self, session, user), fields(authenticated = user.is_some()))]
    pub async fn resolve(
        &self,
        session: &Session,
        user: Option<&CurrentUser>,
    ) -> Result<Cart, CartServiceError> {
        if let Some(user) = user {
            let customer = self.customers.get_or_create_for_user(user.id).await?;
            return Ok(self.carts.get_or_create_for_customer(customer.id).await?);
        }

        if let Some(id) = session.get::<CartId>(session_keys::CART_ID).await?
            && let Some(cart) = self.carts.active_anonymous(id).await?
        {
            return Ok(cart);
        }

        Ok(Cart::unsaved())
    }

    /// Add a product to the cart.
    ///
    /// An unsaved anonymous cart is stored first and remembered in the
    /// session.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::ProductNotFound` for an unknown slug and
    /// `CartServiceError::Cart` if the cart rejects the product.
    pub async fn add(
        &self,
        session: &Session,
        cart: &mut Cart,
        slug: &Slug,
    ) -> Result<CartChange, CartServiceError> {
        let product = self.product(slug).await?;
        let change = cart.add_product(LineProduct::from(&product))?;
        if cart.id.is_none() {
            self.store_anonymous(session, cart).await?;
        }
        self.carts.apply(cart, &change).await?;
        Ok(change)
    }

    /// Delete anonymous carts idle for longer than `idle_for`.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if the delete fails.
    pub async fn prune_anonymous(&self, idle_for: TimeDelta) -> Result<u64, CartServiceError> {
        let pruned = self.carts.prune_anonymous(idle_for).await?;
        tracing::info!(pruned, "Pruned idle anonymous carts");
        Ok(pruned)
    }

    async fn store_anonymous(
        &self,
        session: &Session,
        cart: &mut Cart,
    ) -> Result<(), CartServiceError> {
        let (id, created_at) = self.carts.create_anonymous().await?;
        session.insert(session_keys::CART_ID, id).await?;
        tracing::debug!(cart_id = %id, "Created anonymous cart");
        cart.id = Some(id);
        cart.created_at = created_at;
        Ok(())
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::ProductNotFound` for an unknown slug and
    /// `CartServiceError::Cart` if the product is not in the cart.
    pub async fn remove(&self, cart: &mut Cart, slug: &Slug) -> Result<CartChange, CartServiceError> {
        let product = self.product(slug).await?;
        let change = cart.remove_product(product.id)?;
        self.carts.apply(cart, &change).await?;
        Ok(change)
    }

    /// Set the quantity of a product already in the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::ProductNotFound` for an unknown slug and
    /// `CartServiceError::Cart` for a zero qty or a product not in the cart.
    pub async fn change_qty(
        &self,
        cart: &mut Cart,
        slug: &Slug,
        qty: u32,
    ) -> Result<CartChange, CartServiceError> {
        let product = self.product(slug).await?;
        let change = cart.set_quantity(product.id, qty)?;
        self.carts.apply(cart, &change).await?;
        Ok(change)
    }

    async fn product(&self, slug: &Slug) -> Result<Product, CartServiceError> {
        self.catalog
            .product_by_slug(slug)
            .await?
            .ok_or_else(|| CartServiceError::ProductNotFound(slug.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use sqlx::postgres::PgPoolOptions;
    use tower_sessions::MemoryStore;

    use super::*;

    /// A pool that fails any query it is asked to run.
    fn unreachable_pool() -> PgPool {
        PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(50))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_visitor_without_cart_touches_nothing() {
        let pool = unreachable_pool();
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        let cart = CartService::new(&pool).resolve(&session, None).await.unwrap();

        assert_eq!(cart.id, None);
        assert!(cart.is_empty());
        assert!(cart.is_anonymous());
        assert_eq!(
            session.get::<CartId>(session_keys::CART_ID).await.unwrap(),
            None
        );
        assert!(session.is_empty().await);
    }
}
