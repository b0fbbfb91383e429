//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::db::CatalogRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::{CurrentCart, Flashes, OptionalAuth};
use crate::models::{LATEST_PER_CATEGORY, Product, prioritize_category};
use crate::routes::PageContext;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub products: Vec<Product>,
}

/// Display the home page.
///
/// Lists the newest products of every category, with the configured
/// priority category first.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    CurrentCart(cart): CurrentCart,
    flashes: Flashes,
) -> Result<HomeTemplate> {
    let mut products = CatalogRepository::new(state.pool())
        .latest_products(LATEST_PER_CATEGORY)
        .await?;
    prioritize_category(&mut products, state.config().priority_category.as_ref());

    Ok(HomeTemplate {
        page: PageContext::load(&state, user, &cart, flashes).await?,
        products,
    })
}
