//! Shopping cart aggregate.
//!
//! Cart mutations are applied to an in-memory [`Cart`] first. Each mutation
//! returns a [`CartChange`] that the repository persists, and totals are
//! recalculated after every change so the aggregate is always consistent.

use chrono::{DateTime, Utc};

use techshop_core::{CartId, CartProductId, CustomerId, Money, ProductId, Slug};

/// Errors raised by cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// The product has no line in the cart.
    #[error("product is not in the cart")]
    NotInCart,
    /// Quantity must be at least one.
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    /// The cart already belongs to an order.
    #[error("cart is already part of an order")]
    Frozen,
    /// The cart has no lines.
    #[error("cart is empty")]
    Empty,
    /// The line or cart total would not fit a stored amount.
    #[error("cart total is too large")]
    TooLarge,
}

/// Who a cart belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOwner {
    Customer(CustomerId),
    Anonymous,
}

impl CartOwner {
    /// The owning customer, if any.
    #[must_use]
    pub const fn customer(&self) -> Option<CustomerId> {
        match self {
            Self::Customer(id) => Some(*id),
            Self::Anonymous => None,
        }
    }
}

/// The product side of a cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineProduct {
    pub id: ProductId,
    pub slug: Slug,
    pub title: String,
    pub image_url: Option<String>,
    pub price: Money,
}

impl LineProduct {
    /// Canonical URL of the product page.
    #[must_use]
    pub fn url(&self) -> String {
        format!("/products/{}/", self.slug)
    }
}

/// A cart line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    /// Row id; `None` until the line has been persisted.
    pub id: Option<CartProductId>,
    pub product: LineProduct,
    pub qty: u32,
    pub final_price: Money,
}

impl CartLine {
    fn new(product: LineProduct) -> Self {
        Self {
            id: None,
            final_price: product.price,
            product,
            qty: 1,
        }
    }
}

/// What a mutation changed, for the repository to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// Nothing to write.
    Unchanged,
    /// A new line was added.
    LineAdded(ProductId),
    /// A line was deleted.
    LineRemoved(ProductId),
    /// A line's qty and price changed.
    LineUpdated(ProductId),
}

/// A shopping cart with its line items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    /// `None` for an anonymous cart that has not been stored yet.
    pub id: Option<CartId>,
    pub owner: CartOwner,
    pub lines: Vec<CartLine>,
    pub total_products: u32,
    pub final_price: Money,
    pub in_order: bool,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// Largest qty a line can hold (the `INTEGER` column).
    pub const MAX_QTY: u32 = i32::MAX.unsigned_abs();

    /// An empty anonymous cart that exists only for this request.
    ///
    /// It is stored the first time a product is added.
    #[must_use]
    pub fn unsaved() -> Self {
        Self {
            id: None,
            owner: CartOwner::Anonymous,
            lines: Vec::new(),
            total_products: 0,
            final_price: Money::zero(),
            in_order: false,
            created_at: Utc::now(),
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether the cart is anonymous.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self.owner, CartOwner::Anonymous)
    }

    /// The line for a product, if present.
    #[must_use]
    pub fn line(&self, product: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product.id == product)
    }

    /// Whether the product has a line in the cart.
    #[must_use]
    pub fn contains(&self, product: ProductId) -> bool {
        self.line(product).is_some()
    }

    /// Recompute totals from the lines.
    ///
    /// `total_products` counts distinct lines, not units. Totals are left
    /// untouched when the sum does not fit a stored amount.
    ///
    /// # Errors
    ///
    /// Returns `CartError::TooLarge` if the total overflows.
    pub fn recalculate(&mut self) -> Result<(), CartError> {
        let final_price = Money::checked_sum(self.lines.iter().map(|l| l.final_price))
            .map_err(|_| CartError::TooLarge)?;
        self.total_products = u32::try_from(self.lines.len()).unwrap_or(u32::MAX);
        self.final_price = final_price;
        Ok(())
    }

    /// Add one unit of a product.
    ///
    /// Re-adding a product already in the cart leaves its line untouched.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Frozen` if the cart belongs to an order, or
    /// `CartError::TooLarge` if the new total would overflow.
    pub fn add_product(&mut self, product: LineProduct) -> Result<CartChange, CartError> {
        self.ensure_open()?;
        if self.contains(product.id) {
            return Ok(CartChange::Unchanged);
        }
        let product_id = product.id;
        self.lines.push(CartLine::new(product));
        if let Err(err) = self.recalculate() {
            self.lines.pop();
            return Err(err);
        }
        Ok(CartChange::LineAdded(product_id))
    }

    /// Delete the line for a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the product has no line, or
    /// `CartError::Frozen` if the cart belongs to an order.
    pub fn remove_product(&mut self, product: ProductId) -> Result<CartChange, CartError> {
        self.ensure_open()?;
        let before = self.lines.len();
        self.lines.retain(|l| l.product.id != product);
        if self.lines.len() == before {
            return Err(CartError::NotInCart);
        }
        self.recalculate()?;
        Ok(CartChange::LineRemoved(product))
    }

    /// Set the quantity of a product's line and reprice it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero qty,
    /// `CartError::NotInCart` if the product has no line,
    /// `CartError::TooLarge` if the line or cart total would overflow, or
    /// `CartError::Frozen` if the cart belongs to an order. A rejected
    /// change leaves the cart as it was.
    pub fn set_quantity(&mut self, product: ProductId, qty: u32) -> Result<CartChange, CartError> {
        self.ensure_open()?;
        if qty == 0 {
            return Err(CartError::InvalidQuantity);
        }
        if qty > Self::MAX_QTY {
            return Err(CartError::TooLarge);
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product.id == product)
            .ok_or(CartError::NotInCart)?;
        if line.qty == qty {
            return Ok(CartChange::Unchanged);
        }
        let final_price = line
            .product
            .price
            .checked_times(qty)
            .map_err(|_| CartError::TooLarge)?;
        let previous = (line.qty, line.final_price);
        line.qty = qty;
        line.final_price = final_price;

        if let Err(err) = self.recalculate() {
            if let Some(line) = self.lines.iter_mut().find(|l| l.product.id == product) {
                (line.qty, line.final_price) = previous;
            }
            return Err(err);
        }
        Ok(CartChange::LineUpdated(product))
    }

    /// Mark the cart as part of an order.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Empty` for a cart without lines, or
    /// `CartError::Frozen` if it was already ordered.
    pub fn freeze(&mut self) -> Result<(), CartError> {
        self.ensure_open()?;
        if self.is_empty() {
            return Err(CartError::Empty);
        }
        self.in_order = true;
        Ok(())
    }

    const fn ensure_open(&self) -> Result<(), CartError> {
        if self.in_order {
            Err(CartError::Frozen)
        } else {
            Ok(())
        }
    }
}
