//! Catalog upserts used by the operator CLI when seeding.
//!
//! All functions take a connection so the caller can run a whole seed file
//! inside one transaction.

use sqlx::PgConnection;

use techshop_core::{CategoryId, FeatureId, Money, ProductId, Slug};

use super::RepositoryError;

/// Feature definition to upsert.
#[derive(Debug, Clone)]
pub struct SeedFeature<'a> {
    pub name: &'a str,
    pub key: &'a str,
    pub unit: Option<&'a str>,
    pub use_in_filter: bool,
    pub position: i32,
}

/// Product fields to upsert.
#[derive(Debug, Clone)]
pub struct SeedProduct<'a> {
    pub title: &'a str,
    pub slug: &'a Slug,
    pub image_url: Option<&'a str>,
    pub description: Option<&'a str>,
    pub price: Money,
}

/// Insert or rename a category, keyed by slug.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn upsert_category(
    conn: &mut PgConnection,
    name: &str,
    slug: &Slug,
) -> Result<CategoryId, RepositoryError> {
    let id = sqlx::query_scalar(
        r"
        INSERT INTO storefront.category (name, slug)
        VALUES ($1, $2)
        ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        ",
    )
    .bind(name)
    .bind(slug.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Insert or update a category feature, keyed by `(category, key)`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn upsert_feature(
    conn: &mut PgConnection,
    category: CategoryId,
    feature: &SeedFeature<'_>,
) -> Result<FeatureId, RepositoryError> {
    let id = sqlx::query_scalar(
        r"
        INSERT INTO storefront.category_feature
            (category_id, name, key, unit, use_in_filter, position)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (category_id, key) DO UPDATE
        SET name = EXCLUDED.name,
            unit = EXCLUDED.unit,
            use_in_filter = EXCLUDED.use_in_filter,
            position = EXCLUDED.position
        RETURNING id
        ",
    )
    .bind(category)
    .bind(feature.name)
    .bind(feature.key)
    .bind(feature.unit)
    .bind(feature.use_in_filter)
    .bind(feature.position)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Replace the allowed values of a feature.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a statement fails.
pub async fn replace_validators(
    conn: &mut PgConnection,
    category: CategoryId,
    feature: FeatureId,
    values: &[String],
) -> Result<(), RepositoryError> {
    sqlx::query(
        "DELETE FROM storefront.feature_validator WHERE feature_id = $1 AND NOT (value = ANY($2))",
    )
    .bind(feature)
    .bind(values)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
        INSERT INTO storefront.feature_validator (category_id, feature_id, value)
        SELECT $1, $2, v FROM UNNEST($3::TEXT[]) AS v
        ON CONFLICT (feature_id, value) DO NOTHING
        ",
    )
    .bind(category)
    .bind(feature)
    .bind(values)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Insert or update a product, keyed by slug.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn upsert_product(
    conn: &mut PgConnection,
    category: CategoryId,
    product: &SeedProduct<'_>,
) -> Result<ProductId, RepositoryError> {
    let id = sqlx::query_scalar(
        r"
        INSERT INTO storefront.product (category_id, title, slug, image_url, description, price)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (slug) DO UPDATE
        SET category_id = EXCLUDED.category_id,
            title = EXCLUDED.title,
            image_url = EXCLUDED.image_url,
            description = EXCLUDED.description,
            price = EXCLUDED.price
        RETURNING id
        ",
    )
    .bind(category)
    .bind(product.title)
    .bind(product.slug.as_str())
    .bind(product.image_url)
    .bind(product.description)
    .bind(product.price)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Replace all feature values of a product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a statement fails.
pub async fn replace_product_features(
    conn: &mut PgConnection,
    product: ProductId,
    values: &[(FeatureId, String)],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM storefront.product_feature WHERE product_id = $1")
        .bind(product)
        .execute(&mut *conn)
        .await?;

    let (feature_ids, values): (Vec<i64>, Vec<String>) = values
        .iter()
        .map(|(id, value)| (id.as_i64(), value.clone()))
        .unzip();

    sqlx::query(
        r"
        INSERT INTO storefront.product_feature (product_id, feature_id, value)
        SELECT $1, f.feature_id, f.value
        FROM UNNEST($2::BIGINT[], $3::TEXT[]) AS f (feature_id, value)
        ",
    )
    .bind(product)
    .bind(feature_ids)
    .bind(values)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Reprice open cart lines after product prices changed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a statement fails.
pub async fn reprice_open_carts(conn: &mut PgConnection) -> Result<u64, RepositoryError> {
    let updated = sqlx::query(
        r"
        UPDATE storefront.cart_product cp
        SET final_price = cp.qty * p.price
        FROM storefront.product p, storefront.cart c
        WHERE p.id = cp.product_id
          AND c.id = cp.cart_id
          AND NOT c.in_order
          AND cp.final_price <> cp.qty * p.price
        ",
    )
    .execute(&mut *conn)
    .await?
    .rows_affected();

    sqlx::query(
        r"
        UPDATE storefront.cart c
        SET total_products = t.line_count,
            final_price = t.total
        FROM (
            SELECT c2.id,
                   COUNT(cp.id)::INTEGER AS line_count,
                   COALESCE(SUM(cp.final_price), 0) AS total
            FROM storefront.cart c2
            LEFT JOIN storefront.cart_product cp ON cp.cart_id = c2.id
            WHERE NOT c2.in_order
            GROUP BY c2.id
        ) t
        WHERE c.id = t.id
        ",
    )
    .execute(&mut *conn)
    .await?;

    Ok(updated)
}
