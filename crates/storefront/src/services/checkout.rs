//! Checkout: order form validation and order placement.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use techshop_core::BuyingType;

use crate::db::{ConflictKind, OrderRepository, RepositoryError};
use crate::models::{Cart, CartError, Customer, NewOrder, Order, User};
use crate::services::auth::is_valid_phone;
use crate::services::form::{FormErrors, optional_text};

/// Matches `storefront.order.first_name` and `last_name`.
const MAX_NAME_LENGTH: usize = 255;
/// Matches `storefront.order.phone`.
const MAX_PHONE_LENGTH: usize = 20;
/// Matches `storefront.order.address`.
const MAX_ADDRESS_LENGTH: usize = 1024;

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The order form failed validation.
    #[error("invalid order: {0}")]
    Validation(FormErrors),

    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// The cart was already turned into an order.
    #[error("cart is already ordered")]
    AlreadyOrdered,

    /// The cart has no owning customer.
    #[error("cart is not owned by a customer")]
    NoCustomer,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<CartError> for CheckoutError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Frozen => Self::AlreadyOrdered,
            CartError::Empty
            | CartError::NotInCart
            | CartError::InvalidQuantity
            | CartError::TooLarge => Self::EmptyCart,
        }
    }
}

/// Raw order form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInput {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub buying_type: String,
    #[serde(default)]
    pub order_date: String,
    #[serde(default)]
    pub comment: String,
}

impl OrderInput {
    /// A form prefilled from the account and customer profile.
    #[must_use]
    pub fn prefilled(user: &User, customer: &Customer, today: NaiveDate) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: customer.phone.clone().unwrap_or_default(),
            address: customer.address.clone().unwrap_or_default(),
            buying_type: BuyingType::default().as_str().to_owned(),
            order_date: today.format("%Y-%m-%d").to_string(),
            comment: String::new(),
        }
    }
}

/// Validate an order form.
///
/// `today` is the earliest acceptable order date.
///
/// # Errors
///
/// Returns every field error found.
pub fn validate_order(input: &OrderInput, today: NaiveDate) -> Result<NewOrder, FormErrors> {
    let mut errors = FormErrors::new();

    let first_name = required_name(&mut errors, "first_name", &input.first_name);
    let last_name = required_name(&mut errors, "last_name", &input.last_name);

    let phone = input.phone.trim().to_owned();
    if phone.is_empty() {
        errors.add("phone", "Phone is required");
    } else if !is_valid_phone(&phone, MAX_PHONE_LENGTH) {
        errors.add(
            "phone",
            format!("Use at most {MAX_PHONE_LENGTH} digits, spaces and + - ( )"),
        );
    }

    let buying_type = match input.buying_type.trim() {
        "" => BuyingType::default(),
        raw => raw.parse().unwrap_or_else(|_| {
            errors.add("buying_type", "Choose a valid buying type");
            BuyingType::default()
        }),
    };

    let address = optional_text(&input.address);
    match &address {
        Some(a) if a.chars().count() > MAX_ADDRESS_LENGTH => {
            errors.add(
                "address",
                format!("Must be at most {MAX_ADDRESS_LENGTH} characters"),
            );
        }
        None if buying_type.requires_address() => {
            errors.add("address", "Address is required for delivery");
        }
        _ => {}
    }

    let order_date = match NaiveDate::parse_from_str(input.order_date.trim(), "%Y-%m-%d") {
        Ok(date) if date < today => {
            errors.add("order_date", "Order date cannot be in the past");
            today
        }
        Ok(date) => date,
        Err(_) => {
            errors.add("order_date", "Enter a date as YYYY-MM-DD");
            today
        }
    };

    let order = NewOrder {
        first_name,
        last_name,
        phone,
        address,
        buying_type,
        order_date,
        comment: optional_text(&input.comment),
    };
    errors.into_result(order)
}

fn required_name(errors: &mut FormErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "This field is required");
    } else if value.chars().count() > MAX_NAME_LENGTH {
        errors.add(field, format!("Must be at most {MAX_NAME_LENGTH} characters"));
    }
    value.to_owned()
}

/// Checkout service.
pub struct CheckoutService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// Turn the cart into an order.
    ///
    /// On success the cart is frozen and no longer returned as the
    /// customer's open cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` for an invalid form,
    /// `CheckoutError::EmptyCart` or `CheckoutError::AlreadyOrdered` for a
    /// cart that cannot be ordered, and `CheckoutError::Repository` if the
    /// transaction fails.
    #[instrument(skip(self, cart, input), fields(cart_id = ?cart.id))]
    pub async fn place_order(
        &self,
        cart: &mut Cart,
        input: &OrderInput,
        today: NaiveDate,
    ) -> Result<Order, CheckoutError> {
        let customer = cart.owner.customer().ok_or(CheckoutError::NoCustomer)?;
        let new_order = validate_order(input, today).map_err(CheckoutError::Validation)?;

        let mut frozen = cart.clone();
        frozen.freeze()?;
        let cart_id = cart.id.ok_or(CheckoutError::EmptyCart)?;

        let order = self
            .orders
            .place(customer, cart_id, &new_order)
            .await
            .map_err(placement_error)?;

        *cart = frozen;
        tracing::info!(order_id = %order.id, customer_id = %customer, "Order placed");
        Ok(order)
    }
}

/// Translate a refused order placement into a checkout outcome.
fn placement_error(err: RepositoryError) -> CheckoutError {
    match err {
        RepositoryError::Conflict(ConflictKind::CartEmpty) => CheckoutError::EmptyCart,
        RepositoryError::Conflict(ConflictKind::CartOrdered) => CheckoutError::AlreadyOrdered,
        other => CheckoutError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn input() -> OrderInput {
        OrderInput {
            first_name: "Ann".to_owned(),
            last_name: "Smith".to_owned(),
            phone: "+1 555 0100".to_owned(),
            address: String::new(),
            buying_type: "self".to_owned(),
            order_date: "2026-03-10".to_owned(),
            comment: "  ".to_owned(),
        }
    }

    #[test]
    fn test_valid_self_pickup_order() {
        let order = validate_order(&input(), today()).unwrap();
        assert_eq!(order.buying_type, BuyingType::SelfPickup);
        assert_eq!(order.address, None);
        assert_eq!(order.comment, None);
        assert_eq!(order.order_date, today());
    }

    #[test]
    fn test_delivery_requires_address() {
        let mut form = input();
        form.buying_type = "delivery".to_owned();
        let errors = validate_order(&form, today()).unwrap_err();
        assert_eq!(
            errors.first("address"),
            Some("Address is required for delivery")
        );

        form.address = "1 Main St".to_owned();
        let order = validate_order(&form, today()).unwrap();
        assert_eq!(order.address.as_deref(), Some("1 Main St"));
    }

    #[test]
    fn test_rejects_past_and_malformed_dates() {
        let mut form = input();
        form.order_date = "2026-03-09".to_owned();
        let errors = validate_order(&form, today()).unwrap_err();
        assert_eq!(
            errors.first("order_date"),
            Some("Order date cannot be in the past")
        );

        form.order_date = "10.03.2026".to_owned();
        let errors = validate_order(&form, today()).unwrap_err();
        assert!(errors.has("order_date"));
    }

    #[test]
    fn test_required_fields_and_phone() {
        let form = OrderInput {
            phone: "abc".to_owned(),
            order_date: "2026-04-01".to_owned(),
            ..OrderInput::default()
        };
        let errors = validate_order(&form, today()).unwrap_err();
        assert!(errors.has("first_name"));
        assert!(errors.has("last_name"));
        assert!(errors.has("phone"));
        assert!(!errors.has("order_date"));
    }

    #[test]
    fn test_unknown_buying_type() {
        let mut form = input();
        form.buying_type = "drone".to_owned();
        let errors = validate_order(&form, today()).unwrap_err();
        assert_eq!(
            errors.first("buying_type"),
            Some("Choose a valid buying type")
        );
    }

    #[test]
    fn test_cart_error_mapping() {
        assert!(matches!(
            CheckoutError::from(CartError::Frozen),
            CheckoutError::AlreadyOrdered
        ));
        assert!(matches!(
            CheckoutError::from(CartError::Empty),
            CheckoutError::EmptyCart
        ));
    }

    #[test]
    fn test_placement_error_follows_conflict_kind() {
        assert!(matches!(
            placement_error(RepositoryError::Conflict(ConflictKind::CartEmpty)),
            CheckoutError::EmptyCart
        ));
        assert!(matches!(
            placement_error(RepositoryError::Conflict(ConflictKind::CartOrdered)),
            CheckoutError::AlreadyOrdered
        ));
        assert!(matches!(
            placement_error(RepositoryError::Conflict(ConflictKind::Quantity)),
            CheckoutError::Repository(RepositoryError::Conflict(ConflictKind::Quantity))
        ));
        assert!(matches!(
            placement_error(RepositoryError::NotFound),
            CheckoutError::Repository(RepositoryError::NotFound)
        ));
    }
}
