//! Order domain types.

use chrono::{DateTime, NaiveDate, Utc};

use techshop_core::{BuyingType, CartId, CustomerId, Money, OrderId, OrderStatus};

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub cart_id: CartId,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: Option<String>,
    pub status: OrderStatus,
    pub buying_type: BuyingType,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub order_date: NaiveDate,
}

/// An order joined with its cart totals, for order history listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub order: Order,
    pub total_products: u32,
    pub final_price: Money,
}

/// Validated order data ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: Option<String>,
    pub buying_type: BuyingType,
    pub order_date: NaiveDate,
    pub comment: Option<String>,
}
