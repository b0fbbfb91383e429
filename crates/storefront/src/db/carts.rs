//! Cart repository: active-cart lookup and persistence of cart changes.

use chrono::{DateTime, TimeDelta, Utc};
use sqlx::{PgConnection, PgPool};

use techshop_core::{CartId, CartProductId, CustomerId, Money, ProductId, Slug};

use super::{ConflictKind, RepositoryError, count_to_u32};
use crate::models::{Cart, CartChange, CartLine, CartOwner, LineProduct};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    owner_id: Option<CustomerId>,
    total_products: i32,
    final_price: Money,
    in_order: bool,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LineRow {
    id: CartProductId,
    product_id: ProductId,
    slug: String,
    title: String,
    image_url: Option<String>,
    price: Money,
    qty: i32,
    final_price: Money,
}

impl TryFrom<LineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Some(row.id),
            product: LineProduct {
                id: row.product_id,
                slug: Slug::parse(&row.slug)
                    .map_err(|e| RepositoryError::corrupt("product slug", e))?,
                title: row.title,
                image_url: row.image_url,
                price: row.price,
            },
            qty: count_to_u32("line qty", row.qty)?,
            final_price: row.final_price,
        })
    }
}

/// Recompute a cart's totals from its stored lines.
async fn store_totals(conn: &mut PgConnection, cart: CartId) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE storefront.cart c
        SET total_products = t.line_count,
            final_price = t.total,
            updated_at = NOW()
        FROM (
            SELECT COUNT(*)::INTEGER AS line_count,
                   COALESCE(SUM(final_price), 0) AS total
            FROM storefront.cart_product
            WHERE cart_id = $1
        ) t
        WHERE c.id = $1
        ",
    )
    .bind(cart)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Repository for carts and their line items.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the customer's active cart, creating one if none exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_or_create_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Cart, RepositoryError> {
        if let Some(cart) = self.active_for_customer(customer).await? {
            return Ok(cart);
        }

        // A concurrent request may win the race; the partial unique index
        // turns the loser into a no-op and the re-read finds the winner's cart.
        sqlx::query(
            r"
            INSERT INTO storefront.cart (owner_id, for_anonymous_user)
            VALUES ($1, FALSE)
            ON CONFLICT (owner_id) WHERE NOT in_order AND owner_id IS NOT NULL DO NOTHING
            ",
        )
        .bind(customer)
        .execute(self.pool)
        .await?;

        self.active_for_customer(customer)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Get the customer's cart that is not yet part of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn active_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, owner_id, total_products, final_price, in_order, created_at
            FROM storefront.cart
            WHERE owner_id = $1 AND NOT in_order
            ",
        )
        .bind(customer)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Get an anonymous cart by id, if it is still open.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn active_anonymous(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, owner_id, total_products, final_price, in_order, created_at
            FROM storefront.cart
            WHERE id = $1 AND for_anonymous_user AND NOT in_order
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Insert an empty anonymous cart, returning its id and creation time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_anonymous(&self) -> Result<(CartId, DateTime<Utc>), RepositoryError> {
        let row = sqlx::query_as::<_, (CartId, DateTime<Utc>)>(
            r"
            INSERT INTO storefront.cart (owner_id, for_anonymous_user)
            VALUES (NULL, TRUE)
            RETURNING id, created_at
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Delete anonymous carts nobody has touched for `idle_for`.
    ///
    /// Their line items go with them. Returns the number of carts deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn prune_anonymous(&self, idle_for: TimeDelta) -> Result<u64, RepositoryError> {
        let cutoff = Utc::now() - idle_for;
        let result = sqlx::query(
            r"
            DELETE FROM storefront.cart
            WHERE for_anonymous_user AND NOT in_order AND updated_at < $1
            ",
        )
        .bind(cutoff)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Line items of a cart, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, LineRow>(
            r"
            SELECT cp.id, cp.product_id, p.slug, p.title, p.image_url, p.price,
                   cp.qty, cp.final_price
            FROM storefront.cart_product cp
            JOIN storefront.product p ON p.id = cp.product_id
            WHERE cp.cart_id = $1
            ORDER BY cp.id
            ",
        )
        .bind(cart)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    /// Persist a change produced by the cart aggregate, then store totals.
    ///
    /// Totals are recomputed in SQL from the stored lines so concurrent
    /// changes to the same cart cannot leave stale sums behind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart was never stored or
    /// the changed line is missing from the aggregate, or
    /// `RepositoryError::Database` if a write fails.
    pub async fn apply(&self, cart: &Cart, change: &CartChange) -> Result<(), RepositoryError> {
        if *change == CartChange::Unchanged {
            return Ok(());
        }
        let cart_id = cart.id.ok_or(RepositoryError::NotFound)?;

        let mut tx = self.pool.begin().await?;

        match change {
            CartChange::Unchanged => {}
            CartChange::LineAdded(product) => {
                let line = cart.line(*product).ok_or(RepositoryError::NotFound)?;
                sqlx::query(
                    r"
                    INSERT INTO storefront.cart_product
                        (cart_id, customer_id, product_id, qty, final_price)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (cart_id, product_id) DO NOTHING
                    ",
                )
                .bind(cart_id)
                .bind(cart.owner.customer())
                .bind(line.product.id)
                .bind(qty_to_i32(line.qty)?)
                .bind(line.final_price)
                .execute(&mut *tx)
                .await?;
            }
            CartChange::LineRemoved(product) => {
                sqlx::query(
                    "DELETE FROM storefront.cart_product WHERE cart_id = $1 AND product_id = $2",
                )
                .bind(cart_id)
                .bind(*product)
                .execute(&mut *tx)
                .await?;
            }
            CartChange::LineUpdated(product) => {
                let line = cart.line(*product).ok_or(RepositoryError::NotFound)?;
                sqlx::query(
                    r"
                    UPDATE storefront.cart_product
                    SET qty = $3, final_price = $4
                    WHERE cart_id = $1 AND product_id = $2
                    ",
                )
                .bind(cart_id)
                .bind(line.product.id)
                .bind(qty_to_i32(line.qty)?)
                .bind(line.final_price)
                .execute(&mut *tx)
                .await?;
            }
        }

        store_totals(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn hydrate(&self, row: CartRow) -> Result<Cart, RepositoryError> {
        let lines = self.lines(row.id).await?;
        let owner = row.owner_id.map_or(CartOwner::Anonymous, CartOwner::Customer);
        Ok(Cart {
            id: Some(row.id),
            owner,
            lines,
            total_products: count_to_u32("cart total_products", row.total_products)?,
            final_price: row.final_price,
            in_order: row.in_order,
            created_at: row.created_at,
        })
    }
}

fn qty_to_i32(qty: u32) -> Result<i32, RepositoryError> {
    i32::try_from(qty).map_err(|_| RepositoryError::Conflict(ConflictKind::Quantity))
}
