//! Seed the catalog from a YAML file.
//!
//! The file declares categories with their features (and optionally the
//! allowed values of each feature), then products with their feature values:
//!
//! ```yaml
//! categories:
//!   - name: Notebooks
//!     slug: notebooks
//!     features:
//!       - key: ram
//!         name: RAM
//!         unit: GB
//!         filter: true
//!         values: ["8", "16", "32"]
//! products:
//!   - title: Asus ZenBook 14
//!     slug: asus-zenbook-14
//!     category: notebooks
//!     price: "1299.00"
//!     features:
//!       ram: "16"
//! ```
//!
//! The whole file is checked before anything is written; every problem is
//! reported at once. Writing happens in a single transaction, so a failure
//! leaves the catalog untouched.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use techshop_core::{CategoryId, FeatureId, Money, Slug};
use techshop_storefront::db::seed::{
    SeedFeature, SeedProduct, replace_product_features, replace_validators, reprice_open_carts,
    upsert_category, upsert_feature, upsert_product,
};

use super::connect;

// =============================================================================
// File Format
// =============================================================================

/// Top-level catalog file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

/// A category and its features.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryEntry {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub features: Vec<FeatureEntry>,
}

/// A feature declared by a category.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureEntry {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    /// Offer the feature as a filter on the category page.
    #[serde(default)]
    pub filter: bool,
    /// Allowed values; empty means any value.
    #[serde(default)]
    pub values: Vec<String>,
}

/// A product with its feature values.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductEntry {
    pub title: String,
    pub slug: String,
    pub category: String,
    pub price: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: HashMap<String, String>,
}

// =============================================================================
// Validation
// =============================================================================

/// A catalog file that passed validation.
#[derive(Debug)]
pub struct ValidCatalog<'a> {
    pub categories: Vec<ValidCategory<'a>>,
    pub products: Vec<ValidProduct<'a>>,
}

#[derive(Debug)]
pub struct ValidCategory<'a> {
    pub entry: &'a CategoryEntry,
    pub slug: Slug,
}

#[derive(Debug)]
pub struct ValidProduct<'a> {
    pub entry: &'a ProductEntry,
    pub slug: Slug,
    pub category: Slug,
    pub price: Money,
    /// Feature values sorted by key.
    pub features: Vec<(&'a str, String)>,
}

/// Check a catalog file without touching the database.
///
/// Products may only reference categories declared in the same file.
///
/// # Errors
///
/// Returns every problem found, each prefixed with the entry it concerns.
pub fn validate(file: &CatalogFile) -> Result<ValidCatalog<'_>, Vec<String>> {
    let mut errors = Vec::new();
    let mut categories = Vec::new();
    let mut features_by_category: HashMap<&str, HashMap<&str, &FeatureEntry>> = HashMap::new();

    for entry in &file.categories {
        let label = format!("category '{}'", entry.slug);

        if entry.name.trim().is_empty() {
            errors.push(format!("{label}: name is required"));
        }

        let slug = match Slug::parse(&entry.slug) {
            Ok(slug) => slug,
            Err(e) => {
                errors.push(format!("{label}: {e}"));
                continue;
            }
        };

        if categories.iter().any(|c: &ValidCategory<'_>| c.slug == slug) {
            errors.push(format!("{label}: declared more than once"));
            continue;
        }
        let features = features_by_category.entry(entry.slug.as_str()).or_default();

        for feature in &entry.features {
            let key = feature.key.trim();
            if key.is_empty() {
                errors.push(format!("{label}: feature key is required"));
                continue;
            }
            if feature.name.trim().is_empty() {
                errors.push(format!("{label}: feature '{key}' needs a name"));
            }
            if features.insert(feature.key.as_str(), feature).is_some() {
                errors.push(format!("{label}: feature '{key}' declared more than once"));
            }
            let distinct: HashSet<&str> = feature.values.iter().map(|v| v.trim()).collect();
            if distinct.len() != feature.values.len() || distinct.contains("") {
                errors.push(format!(
                    "{label}: feature '{key}' has blank or repeated allowed values"
                ));
            }
        }

        categories.push(ValidCategory { entry, slug });
    }

    let mut products = Vec::new();
    let mut seen_products = HashSet::new();

    for entry in &file.products {
        let label = format!("product '{}'", entry.slug);

        if entry.title.trim().is_empty() {
            errors.push(format!("{label}: title is required"));
        }

        let slug = Slug::parse(&entry.slug).map_err(|e| format!("{label}: {e}"));
        if let Ok(slug) = &slug
            && !seen_products.insert(slug.clone())
        {
            errors.push(format!("{label}: declared more than once"));
        }

        let price = entry
            .price
            .parse::<Money>()
            .map_err(|e| format!("{label}: price {e}"));

        let category = match features_by_category.get(entry.category.as_str()) {
            Some(declared) => {
                check_feature_values(&label, &entry.features, declared, &mut errors);
                Slug::parse(&entry.category).map_err(|e| format!("{label}: {e}"))
            }
            None => Err(format!("{label}: unknown category '{}'", entry.category)),
        };

        match (slug, price, category) {
            (Ok(slug), Ok(price), Ok(category)) => {
                let mut features: Vec<(&str, String)> = entry
                    .features
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.trim().to_owned()))
                    .filter(|(_, value)| !value.is_empty())
                    .collect();
                features.sort_unstable();
                products.push(ValidProduct {
                    entry,
                    slug,
                    category,
                    price,
                    features,
                });
            }
            (slug, price, category) => {
                errors.extend(slug.err());
                errors.extend(price.err());
                errors.extend(category.err());
            }
        }
    }

    if errors.is_empty() {
        Ok(ValidCatalog {
            categories,
            products,
        })
    } else {
        Err(errors)
    }
}

fn check_feature_values(
    label: &str,
    values: &HashMap<String, String>,
    declared: &HashMap<&str, &FeatureEntry>,
    errors: &mut Vec<String>,
) {
    let mut keys: Vec<&String> = values.keys().collect();
    keys.sort_unstable();

    for key in keys {
        let Some(feature) = declared.get(key.as_str()) else {
            errors.push(format!("{label}: unknown feature '{key}'"));
            continue;
        };
        let value = values.get(key).map_or("", |v| v.trim());
        if !value.is_empty()
            && !feature.values.is_empty()
            && !feature.values.iter().any(|allowed| allowed.trim() == value)
        {
            errors.push(format!(
                "{label}: '{value}' is not an allowed value for '{key}' ({})",
                feature.values.join(", ")
            ));
        }
    }
}

// =============================================================================
// Command
// =============================================================================

/// Seed the catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or the database transaction fails.
pub async fn catalog(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }

    info!(path = %path.display(), "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;

    let valid = match validate(&file) {
        Ok(valid) => valid,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };

    info!(
        categories = valid.categories.len(),
        products = valid.products.len(),
        "Catalog validated successfully"
    );

    let pool = connect().await?;
    let mut tx = pool.begin().await?;

    let mut category_ids: HashMap<&Slug, CategoryId> = HashMap::new();
    let mut feature_ids: HashMap<(&Slug, &str), FeatureId> = HashMap::new();

    for category in &valid.categories {
        let category_id = upsert_category(&mut tx, category.entry.name.trim(), &category.slug).await?;
        category_ids.insert(&category.slug, category_id);

        for (position, feature) in category.entry.features.iter().enumerate() {
            let row = SeedFeature {
                name: feature.name.trim(),
                key: feature.key.as_str(),
                unit: feature.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()),
                use_in_filter: feature.filter,
                position: i32::try_from(position)?,
            };
            let feature_id = upsert_feature(&mut tx, category_id, &row).await?;

            let allowed: Vec<String> = feature.values.iter().map(|v| v.trim().to_owned()).collect();
            replace_validators(&mut tx, category_id, feature_id, &allowed).await?;
            feature_ids.insert((&category.slug, feature.key.as_str()), feature_id);
        }
    }

    for product in &valid.products {
        let category_id = *category_ids
            .get(&product.category)
            .ok_or_else(|| format!("category '{}' was not written", product.category))?;

        let row = SeedProduct {
            title: product.entry.title.trim(),
            slug: &product.slug,
            image_url: product.entry.image_url.as_deref(),
            description: product.entry.description.as_deref(),
            price: product.price,
        };
        let product_id = upsert_product(&mut tx, category_id, &row).await?;

        let values: Vec<(FeatureId, String)> = product
            .features
            .iter()
            .filter_map(|(key, value)| {
                feature_ids
                    .get(&(&product.category, *key))
                    .map(|id| (*id, value.clone()))
            })
            .collect();
        replace_product_features(&mut tx, product_id, &values).await?;
    }

    let repriced = reprice_open_carts(&mut tx).await?;
    tx.commit().await?;

    info!("Seeding complete!");
    info!("  Categories upserted: {}", valid.categories.len());
    info!("  Products upserted: {}", valid.products.len());
    info!("  Open cart lines repriced: {repriced}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
categories:
  - name: Notebooks
    slug: notebooks
    features:
      - key: ram
        name: RAM
        unit: GB
        filter: true
        values: ["8", "16"]
      - key: cpu
        name: Processor
products:
  - title: Asus ZenBook 14
    slug: asus-zenbook-14
    category: notebooks
    price: "1299.00"
    features:
      ram: "16"
      cpu: Intel Core i7
"#;

    fn parse(yaml: &str) -> CatalogFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_catalog() {
        let file = parse(CATALOG);
        let valid = validate(&file).unwrap();
        assert_eq!(valid.categories.len(), 1);
        assert_eq!(valid.products.len(), 1);

        let product = &valid.products[0];
        assert_eq!(product.category.as_str(), "notebooks");
        assert_eq!(product.price.to_string(), "1299.00");
        assert_eq!(
            product.features,
            vec![("cpu", "Intel Core i7".to_owned()), ("ram", "16".to_owned())]
        );
    }

    #[test]
    fn test_reports_every_problem() {
        let file = parse(
            r#"
categories:
  - name: Notebooks
    slug: notebooks
    features:
      - key: ram
        name: RAM
        values: ["8", "16"]
products:
  - title: Ghost
    slug: ghost
    category: tablets
    price: "10"
  - title: Bad
    slug: Bad Slug
    category: notebooks
    price: "-5"
    features:
      ram: "64"
      colour: red
"#,
        );

        let errors = validate(&file).unwrap_err();
        let joined = errors.join("\n");
        assert!(joined.contains("unknown category 'tablets'"), "{joined}");
        assert!(joined.contains("product 'Bad Slug'"), "{joined}");
        assert!(joined.contains("amount cannot be negative"), "{joined}");
        assert!(joined.contains("'64' is not an allowed value for 'ram'"), "{joined}");
        assert!(joined.contains("unknown feature 'colour'"), "{joined}");
    }

    #[test]
    fn test_duplicates_are_rejected() {
        let file = parse(
            r#"
categories:
  - name: Phones
    slug: smartphones
    features:
      - key: ram
        name: RAM
      - key: ram
        name: Memory
products:
  - title: A
    slug: phone-a
    category: smartphones
    price: "1"
  - title: A again
    slug: phone-a
    category: smartphones
    price: "2"
"#,
        );

        let errors = validate(&file).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("feature 'ram' declared more than once")));
        assert!(errors.iter().any(|e| e == "product 'phone-a': declared more than once"));
    }

    #[test]
    fn test_free_form_feature_accepts_any_value() {
        let file = parse(
            r#"
categories:
  - name: Notebooks
    slug: notebooks
    features:
      - key: cpu
        name: Processor
products:
  - title: X
    slug: x
    category: notebooks
    price: "1.5"
    features:
      cpu: "anything goes"
"#,
        );
        assert!(validate(&file).is_ok());
    }

    #[test]
    fn test_unknown_fields_fail_to_parse() {
        let result: Result<CatalogFile, _> = serde_yaml::from_str("categories: []\nvendors: []\n");
        assert!(result.is_err());
    }
}
