//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tracing::instrument;

use crate::db::{CatalogRepository, FeatureRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CurrentCart, Flashes, OptionalAuth};
use crate::models::{Category, Product, SpecRow, spec_table};
use crate::routes::{PageContext, parse_slug};
use crate::state::AppState;

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: Product,
    pub category: Category,
    pub specs: Vec<SpecRow>,
    pub in_cart: bool,
}

/// Display product detail page.
#[instrument(skip(state, user, cart, flashes))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    OptionalAuth(user): OptionalAuth,
    CurrentCart(cart): CurrentCart,
    flashes: Flashes,
) -> Result<ProductShowTemplate> {
    let slug = parse_slug(&slug)?;
    let catalog = CatalogRepository::new(state.pool());

    let product = catalog
        .product_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;
    let category = catalog.category(product.category_id).await?;

    let features = FeatureRepository::new(state.pool());
    let specs = spec_table(
        &features.for_category(category.id).await?,
        &features.values_for_product(product.id).await?,
    );

    Ok(ProductShowTemplate {
        in_cart: cart.contains(product.id),
        page: PageContext::load(&state, user, &cart, flashes).await?,
        product,
        category,
        specs,
    })
}
