//! Account route handlers (require auth).

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::db::{CustomerRepository, OrderRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{CurrentCart, Flashes, RequireAuth};
use crate::models::{Customer, OrderSummary, User};
use crate::routes::PageContext;
use crate::services::AuthService;
use crate::state::AppState;

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub account: User,
    pub customer: Customer,
    pub orders: Vec<OrderSummary>,
}

/// Display the customer's profile and order history, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    CurrentCart(cart): CurrentCart,
    flashes: Flashes,
) -> Result<ProfileTemplate> {
    let account = AuthService::new(state.pool(), &state.config().blocked_email_domains)
        .get_user(user.id)
        .await?;
    let customer = CustomerRepository::new(state.pool())
        .get_or_create_for_user(user.id)
        .await?;
    let orders = OrderRepository::new(state.pool())
        .for_customer(customer.id)
        .await?;

    Ok(ProfileTemplate {
        page: PageContext::load(&state, Some(user), &cart, flashes).await?,
        account,
        customer,
        orders,
    })
}
