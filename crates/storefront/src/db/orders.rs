//! Order repository.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use techshop_core::{BuyingType, CartId, CustomerId, Money, OrderId, OrderStatus};

use super::{ConflictKind, RepositoryError, count_to_u32};
use crate::models::{NewOrder, Order, OrderSummary};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: CustomerId,
    cart_id: CartId,
    first_name: String,
    last_name: String,
    phone: String,
    address: Option<String>,
    status: OrderStatus,
    buying_type: BuyingType,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    order_date: NaiveDate,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            cart_id: row.cart_id,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            address: row.address,
            status: row.status,
            buying_type: row.buying_type,
            comment: row.comment,
            created_at: row.created_at,
            order_date: row.order_date,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderSummaryRow {
    #[sqlx(flatten)]
    order: OrderRow,
    total_products: i32,
    final_price: Money,
}

impl TryFrom<OrderSummaryRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(row: OrderSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            order: row.order.into(),
            total_products: count_to_u32("cart total_products", row.total_products)?,
            final_price: row.final_price,
        })
    }
}

/// State of a cart as seen inside the checkout transaction.
#[derive(sqlx::FromRow)]
struct CartLock {
    owner_id: Option<CustomerId>,
    total_products: i32,
    in_order: bool,
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order for a customer's cart.
    ///
    /// Locks the cart row, inserts the order and marks the cart as ordered
    /// in one transaction. Any failure rolls the whole thing back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart does not belong to the
    /// customer, `RepositoryError::Conflict` if it is empty or already
    /// ordered, and `RepositoryError::Database` if a statement fails.
    pub async fn place(
        &self,
        customer: CustomerId,
        cart: CartId,
        order: &NewOrder,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let lock = sqlx::query_as::<_, CartLock>(
            r"
            SELECT owner_id, total_products, in_order
            FROM storefront.cart
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(cart)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if lock.owner_id != Some(customer) {
            return Err(RepositoryError::NotFound);
        }
        if lock.in_order {
            return Err(RepositoryError::Conflict(ConflictKind::CartOrdered));
        }
        if lock.total_products == 0 {
            return Err(RepositoryError::Conflict(ConflictKind::CartEmpty));
        }

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO storefront.order (
                customer_id, cart_id, first_name, last_name, phone, address,
                buying_type, comment, order_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, customer_id, cart_id, first_name, last_name, phone, address,
                      status, buying_type, comment, created_at, order_date
            ",
        )
        .bind(customer)
        .bind(cart)
        .bind(&order.first_name)
        .bind(&order.last_name)
        .bind(&order.phone)
        .bind(order.address.as_deref())
        .bind(order.buying_type)
        .bind(order.comment.as_deref())
        .bind(order.order_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE storefront.cart SET in_order = TRUE WHERE id = $1")
            .bind(cart)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Orders of a customer with cart totals, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r"
            SELECT o.id, o.customer_id, o.cart_id, o.first_name, o.last_name, o.phone,
                   o.address, o.status, o.buying_type, o.comment, o.created_at, o.order_date,
                   c.total_products, c.final_price
            FROM storefront.order o
            JOIN storefront.cart c ON c.id = o.cart_id
            WHERE o.customer_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .bind(customer)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderSummary::try_from).collect()
    }

    /// All orders, optionally filtered by status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r"
            SELECT o.id, o.customer_id, o.cart_id, o.first_name, o.last_name, o.phone,
                   o.address, o.status, o.buying_type, o.comment, o.created_at, o.order_date,
                   c.total_products, c.final_price
            FROM storefront.order o
            JOIN storefront.cart c ON c.id = o.cart_id
            WHERE $1::TEXT IS NULL OR o.status = $1
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderSummary::try_from).collect()
    }

    /// Change an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE storefront.order
            SET status = $2
            WHERE id = $1
            RETURNING id, customer_id, cart_id, first_name, last_name, phone, address,
                      status, buying_type, comment, created_at, order_date
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }
}
