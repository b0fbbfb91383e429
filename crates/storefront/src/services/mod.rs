//! Business logic services.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod form;

pub use auth::{AuthError, AuthService};
pub use cart::{CartService, CartServiceError};
pub use checkout::{CheckoutError, CheckoutService};
pub use form::FormErrors;
