//! Catalog domain types: categories and products.

use chrono::{DateTime, Utc};

use techshop_core::{CategoryId, Money, ProductId, Slug};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
}

impl Category {
    /// Canonical URL of the category page.
    #[must_use]
    pub fn url(&self) -> String {
        category_url(&self.slug)
    }
}

/// A category with the number of products it holds (sidebar entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub name: String,
    pub slug: Slug,
    pub product_count: i64,
}

impl CategorySummary {
    /// Canonical URL of the category page.
    #[must_use]
    pub fn url(&self) -> String {
        category_url(&self.slug)
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    /// Slug of the owning category, joined in for listings.
    pub category_slug: Slug,
    pub title: String,
    pub slug: Slug,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub price: Money,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Canonical URL of the product page.
    #[must_use]
    pub fn url(&self) -> String {
        format!("/products/{}/", self.slug)
    }
}

fn category_url(slug: &Slug) -> String {
    format!("/category/{slug}/")
}

/// Number of products per category shown on the home page.
pub const LATEST_PER_CATEGORY: usize = 5;

/// Order home-page products so the priority category comes first.
///
/// Products are expected newest-first within each category; the sort is
/// stable, so that order survives. Without a priority category, or when
/// the slug names no listed category, the input order is kept.
pub fn prioritize_category(products: &mut [Product], priority: Option<&Slug>) {
    let Some(priority) = priority else {
        return;
    };
    if !products.iter().any(|p| &p.category_slug == priority) {
        return;
    }
    products.sort_by_key(|p| &p.category_slug != priority);
}
