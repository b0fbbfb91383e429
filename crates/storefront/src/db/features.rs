//! Feature repository: per-category features, product values and filter choices.

use std::collections::HashMap;

use sqlx::PgPool;

use techshop_core::{CategoryId, FeatureId, ProductId};

use super::RepositoryError;
use crate::models::CategoryFeature;

#[derive(sqlx::FromRow)]
struct FeatureRow {
    id: FeatureId,
    category_id: CategoryId,
    name: String,
    key: String,
    unit: Option<String>,
    use_in_filter: bool,
    position: i32,
}

impl From<FeatureRow> for CategoryFeature {
    fn from(row: FeatureRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            name: row.name,
            key: row.key,
            unit: row.unit,
            use_in_filter: row.use_in_filter,
            position: row.position,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FeatureValueRow {
    feature_id: FeatureId,
    value: String,
}

fn group_values(rows: Vec<FeatureValueRow>) -> HashMap<FeatureId, Vec<String>> {
    let mut grouped: HashMap<FeatureId, Vec<String>> = HashMap::new();
    for row in rows {
        grouped.entry(row.feature_id).or_default().push(row.value);
    }
    grouped
}

/// Repository for feature reads.
pub struct FeatureRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FeatureRepository<'a> {
    /// Create a new feature repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Features declared by a category, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<CategoryFeature>, RepositoryError> {
        let rows = sqlx::query_as::<_, FeatureRow>(
            r"
            SELECT id, category_id, name, key, unit, use_in_filter, position
            FROM storefront.category_feature
            WHERE category_id = $1
            ORDER BY position, id
            ",
        )
        .bind(category)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CategoryFeature::from).collect())
    }

    /// Stored feature values of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn values_for_product(
        &self,
        product: ProductId,
    ) -> Result<HashMap<FeatureId, String>, RepositoryError> {
        let rows = sqlx::query_as::<_, FeatureValueRow>(
            "SELECT feature_id, value FROM storefront.product_feature WHERE product_id = $1",
        )
        .bind(product)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| (r.feature_id, r.value)).collect())
    }

    /// Filter choices for each filterable feature of a category.
    ///
    /// A feature with validators offers exactly the validator values;
    /// otherwise it offers the distinct values stored on products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn filter_choices(
        &self,
        category: CategoryId,
    ) -> Result<HashMap<FeatureId, Vec<String>>, RepositoryError> {
        let rows = sqlx::query_as::<_, FeatureValueRow>(
            r"
            SELECT f.id AS feature_id, choice.value
            FROM storefront.category_feature f
            JOIN LATERAL (
                SELECT fv.value
                FROM storefront.feature_validator fv
                WHERE fv.feature_id = f.id
                UNION
                SELECT pf.value
                FROM storefront.product_feature pf
                WHERE pf.feature_id = f.id
                  AND NOT EXISTS (
                      SELECT 1 FROM storefront.feature_validator x WHERE x.feature_id = f.id
                  )
            ) choice ON TRUE
            WHERE f.category_id = $1 AND f.use_in_filter
            ORDER BY f.position, f.id, choice.value
            ",
        )
        .bind(category)
        .fetch_all(self.pool)
        .await?;

        Ok(group_values(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_values_keeps_row_order() {
        let rows = vec![
            FeatureValueRow {
                feature_id: FeatureId::new(2),
                value: "16".to_owned(),
            },
            FeatureValueRow {
                feature_id: FeatureId::new(1),
                value: "i5".to_owned(),
            },
            FeatureValueRow {
                feature_id: FeatureId::new(2),
                value: "32".to_owned(),
            },
        ];
        let grouped = group_values(rows);
        assert_eq!(grouped[&FeatureId::new(2)], vec!["16", "32"]);
        assert_eq!(grouped[&FeatureId::new(1)], vec!["i5"]);
    }
}
