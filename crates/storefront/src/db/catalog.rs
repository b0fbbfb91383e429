//! Catalog repository: categories and products.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use techshop_core::{CategoryId, Money, ProductId, Slug};

use super::RepositoryError;
use crate::models::{Category, CategorySummary, FeatureFilter, Product};

/// Prefix every product query with the shared column list and join.
macro_rules! select_products {
    ($($tail:literal),+ $(,)?) => {
        concat!(
            r"
            SELECT p.id, p.category_id, c.slug AS category_slug, p.title, p.slug,
                   p.image_url, p.description, p.price, p.created_at
            FROM storefront.product p
            JOIN storefront.category c ON c.id = p.category_id
            ",
            $($tail),+
        )
    };
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
}

impl TryFrom<CategoryRow> for Category {
    type Error = RepositoryError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            slug: Slug::parse(&row.slug).map_err(|e| RepositoryError::corrupt("category slug", e))?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategorySummaryRow {
    name: String,
    slug: String,
    product_count: i64,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    category_id: CategoryId,
    category_slug: String,
    title: String,
    slug: String,
    image_url: Option<String>,
    description: Option<String>,
    price: Money,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            category_id: row.category_id,
            category_slug: Slug::parse(&row.category_slug)
                .map_err(|e| RepositoryError::corrupt("category slug", e))?,
            title: row.title,
            slug: Slug::parse(&row.slug).map_err(|e| RepositoryError::corrupt("product slug", e))?,
            image_url: row.image_url,
            description: row.description,
            price: row.price,
            created_at: row.created_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every category with its product count, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sidebar_categories(&self) -> Result<Vec<CategorySummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategorySummaryRow>(
            r"
            SELECT c.name, c.slug, COUNT(p.id) AS product_count
            FROM storefront.category c
            LEFT JOIN storefront.product p ON p.category_id = c.id
            GROUP BY c.id, c.name, c.slug
            ORDER BY c.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CategorySummary {
                    slug: Slug::parse(&row.slug)
                        .map_err(|e| RepositoryError::corrupt("category slug", e))?,
                    name: row.name,
                    product_count: row.product_count,
                })
            })
            .collect()
    }

    /// Get a category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug FROM storefront.category WHERE slug = $1",
        )
        .bind(slug.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Category::try_from).transpose()
    }

    /// Get a category by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn category(&self, id: CategoryId) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug FROM storefront.category WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Category::try_from(row)
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_by_slug(&self, slug: &Slug) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(select_products!("WHERE p.slug = $1"))
            .bind(slug.as_str())
            .fetch_optional(self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// The newest `per_category` products of every category.
    ///
    /// Results are grouped by category, newest first within each group.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_products(&self, per_category: usize) -> Result<Vec<Product>, RepositoryError> {
        let limit = i64::try_from(per_category).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, category_id, category_slug, title, slug,
                   image_url, description, price, created_at
            FROM (
                SELECT p.id, p.category_id, c.slug AS category_slug, p.title, p.slug,
                       p.image_url, p.description, p.price, p.created_at,
                       ROW_NUMBER() OVER (PARTITION BY p.category_id ORDER BY p.id DESC) AS rn
                FROM storefront.product p
                JOIN storefront.category c ON c.id = p.category_id
            ) ranked
            WHERE rn <= $1
            ORDER BY category_id, id DESC
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        into_products(rows)
    }

    /// Products of a category having every selected feature value, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products_in_category(
        &self,
        category: CategoryId,
        filter: &FeatureFilter,
    ) -> Result<Vec<Product>, RepositoryError> {
        let (feature_ids, values) = filter.to_columns();
        let rows = sqlx::query_as::<_, ProductRow>(select_products!(
            r"
            WHERE p.category_id = $1
              AND NOT EXISTS (
                  SELECT 1
                  FROM UNNEST($2::BIGINT[], $3::TEXT[]) AS wanted (feature_id, value)
                  WHERE NOT EXISTS (
                      SELECT 1
                      FROM storefront.product_feature pf
                      WHERE pf.product_id = p.id
                        AND pf.feature_id = wanted.feature_id
                        AND pf.value = wanted.value
                  )
              )
            ORDER BY p.id DESC
            "
        ))
        .bind(category)
        .bind(feature_ids)
        .bind(values)
        .fetch_all(self.pool)
        .await?;

        into_products(rows)
    }
}
