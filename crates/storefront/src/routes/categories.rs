//! Category route handlers.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use tracing::instrument;

use crate::db::{CatalogRepository, FeatureRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CurrentCart, Flashes, OptionalAuth};
use crate::models::{Category, FeatureFacet, FeatureFilter, Product, facets};
use crate::routes::{PageContext, parse_slug};
use crate::state::AppState;

/// Category page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/show.html")]
pub struct CategoryShowTemplate {
    pub page: PageContext,
    pub category: Category,
    pub products: Vec<Product>,
    pub facets: Vec<FeatureFacet>,
    pub filtered: bool,
}

/// Display a category with its products.
///
/// Query parameters named after filterable features narrow the listing,
/// e.g. `/category/notebooks/?ram=16`.
#[instrument(skip(state, query, user, cart, flashes))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    OptionalAuth(user): OptionalAuth,
    CurrentCart(cart): CurrentCart,
    flashes: Flashes,
) -> Result<CategoryShowTemplate> {
    let slug = parse_slug(&slug)?;
    let catalog = CatalogRepository::new(state.pool());

    let category = catalog
        .category_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {slug}")))?;

    let features = FeatureRepository::new(state.pool());
    let category_features = features.for_category(category.id).await?;
    let filter = FeatureFilter::from_query(&category_features, &query);
    let choices = features.filter_choices(category.id).await?;

    let products = catalog.products_in_category(category.id, &filter).await?;
    tracing::debug!(
        category = %category.slug,
        filters = filter.selected().len(),
        products = products.len(),
        "Category listing"
    );

    Ok(CategoryShowTemplate {
        page: PageContext::load(&state, user, &cart, flashes).await?,
        facets: facets(&category_features, &choices, &filter),
        filtered: !filter.is_empty(),
        category,
        products,
    })
}
