//! TechShop Core - Shared domain types.
//!
//! This crate provides the types shared by every TechShop component:
//! - `storefront` - Public catalog, cart, checkout and accounts
//! - `cli` - Migrations, catalog seeding and order management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. Database encoding is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, validated strings, money and order enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
