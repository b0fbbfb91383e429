//! Domain models for the storefront.

pub mod cart;
pub mod catalog;
pub mod features;
pub mod order;
pub mod session;
pub mod user;

pub use cart::{Cart, CartChange, CartError, CartLine, CartOwner, LineProduct};
pub use catalog::{Category, CategorySummary, LATEST_PER_CATEGORY, Product, prioritize_category};
pub use features::{CategoryFeature, FeatureFacet, FeatureFilter, SpecRow, facets, spec_table};
pub use order::{NewOrder, Order, OrderSummary};
pub use session::{CurrentUser, Flash, FlashLevel, keys as session_keys};
pub use user::{Customer, NewUser, User};
