//! Checkout route handlers.
//!
//! The order form is shown to every visitor with a non-empty cart; placing
//! the order requires an account. A rejected form is kept in the session
//! and shown again with its errors after the redirect.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use techshop_core::BuyingType;

use crate::db::CustomerRepository;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CurrentCart, Flashes, OptionalAuth, RequireAuth, push_flash};
use crate::models::{Cart, CurrentUser, Flash, session_keys};
use crate::routes::PageContext;
use crate::services::checkout::OrderInput;
use crate::services::{AuthService, CheckoutError, CheckoutService, FormErrors};
use crate::state::AppState;

const ORDER_PLACED: &str = "Thank you for your order. A manager will contact you.";

/// A rejected order form waiting to be shown again.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckoutDraft {
    input: OrderInput,
    errors: FormErrors,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub cart: Cart,
    pub form: OrderInput,
    pub errors: FormErrors,
    pub buying_types: [BuyingType; 2],
    pub min_date: String,
}

/// The earliest date an order can be scheduled for.
fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Display the order form.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    CurrentCart(cart): CurrentCart,
    flashes: Flashes,
) -> Result<Response> {
    if cart.is_empty() {
        push_flash(&session, Flash::info("Your cart is empty")).await?;
        return Ok(Redirect::to("/cart/").into_response());
    }

    let today = today();
    let draft: Option<CheckoutDraft> = session.remove(session_keys::CHECKOUT_FORM).await?;
    let (form, errors) = match draft {
        Some(draft) => (draft.input, draft.errors),
        None => (
            initial_form(&state, user.as_ref(), today).await?,
            FormErrors::new(),
        ),
    };

    Ok(CheckoutTemplate {
        page: PageContext::load(&state, user, &cart, flashes).await?,
        cart,
        form,
        errors,
        buying_types: BuyingType::ALL,
        min_date: today.format("%Y-%m-%d").to_string(),
    }
    .into_response())
}

/// Order form prefilled from the visitor's profile, if logged in.
async fn initial_form(
    state: &AppState,
    user: Option<&CurrentUser>,
    today: NaiveDate,
) -> Result<OrderInput> {
    let blank = OrderInput {
        buying_type: BuyingType::default().as_str().to_owned(),
        order_date: today.format("%Y-%m-%d").to_string(),
        ..OrderInput::default()
    };
    let Some(current) = user else {
        return Ok(blank);
    };

    let account = AuthService::new(state.pool(), &state.config().blocked_email_domains)
        .get_user(current.id)
        .await?;
    let customer = CustomerRepository::new(state.pool())
        .get_for_user(current.id)
        .await?;

    Ok(customer.map_or(blank, |customer| {
        OrderInput::prefilled(&account, &customer, today)
    }))
}

/// Place the order for the logged-in customer's cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn make_order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    CurrentCart(mut cart): CurrentCart,
    Form(input): Form<OrderInput>,
) -> Result<Redirect> {
    let outcome = CheckoutService::new(state.pool())
        .place_order(&mut cart, &input, today())
        .await;

    match outcome {
        Ok(order) => {
            add_breadcrumb(
                "checkout",
                "Order placed",
                Some(&[("order_id", order.id.to_string().as_str())]),
            );
            push_flash(&session, Flash::success(ORDER_PLACED)).await?;
            Ok(Redirect::to("/"))
        }
        Err(CheckoutError::Validation(errors)) => {
            tracing::debug!(%errors, "Order form rejected");
            session
                .insert(session_keys::CHECKOUT_FORM, CheckoutDraft { input, errors })
                .await?;
            push_flash(&session, Flash::error("Please correct the errors below")).await?;
            Ok(Redirect::to("/checkout/"))
        }
        Err(CheckoutError::EmptyCart | CheckoutError::AlreadyOrdered) => {
            push_flash(&session, Flash::error("Your cart is empty")).await?;
            Ok(Redirect::to("/cart/"))
        }
        Err(err) => Err(err.into()),
    }
}
