//! Per-category product features ("specs") and feature filters.
//!
//! Every category declares its own set of features. Products store one
//! value per feature; features flagged `use_in_filter` become facets on the
//! category page, narrowed through `?<key>=<value>` query parameters.

use std::collections::HashMap;

use techshop_core::{CategoryId, FeatureId};

/// A feature declared by a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFeature {
    pub id: FeatureId,
    pub category_id: CategoryId,
    pub name: String,
    /// Query-string key, unique within the category.
    pub key: String,
    pub unit: Option<String>,
    pub use_in_filter: bool,
    pub position: i32,
}

/// One row of a product's specification table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRow {
    pub name: String,
    pub value: String,
}

/// Build a product's specification table.
///
/// Rows follow the feature `position` order. Features without a stored
/// value, or with a blank one, are left out.
#[must_use]
pub fn spec_table(features: &[CategoryFeature], values: &HashMap<FeatureId, String>) -> Vec<SpecRow> {
    let mut ordered: Vec<&CategoryFeature> = features.iter().collect();
    ordered.sort_by_key(|f| (f.position, f.id));

    ordered
        .into_iter()
        .filter_map(|feature| {
            let value = values.get(&feature.id)?.trim();
            if value.is_empty() {
                return None;
            }
            let value = match feature.unit.as_deref().map(str::trim) {
                Some(unit) if !unit.is_empty() => format!("{value} {unit}"),
                _ => value.to_owned(),
            };
            Some(SpecRow {
                name: feature.name.clone(),
                value,
            })
        })
        .collect()
}

/// A filter facet shown on the category page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFacet {
    pub name: String,
    pub key: String,
    pub unit: Option<String>,
    pub choices: Vec<String>,
    pub selected: Option<String>,
}

impl FeatureFacet {
    /// Whether `choice` is the currently selected value.
    #[must_use]
    pub fn is_selected(&self, choice: &str) -> bool {
        self.selected.as_deref() == Some(choice)
    }
}

/// Feature values selected through the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFilter {
    selected: Vec<(FeatureId, String)>,
}

impl FeatureFilter {
    /// Match query parameters against the category's filterable features.
    ///
    /// Keys naming no filterable feature are ignored, as are blank values.
    #[must_use]
    pub fn from_query(features: &[CategoryFeature], query: &HashMap<String, String>) -> Self {
        let mut selected: Vec<(FeatureId, String)> = features
            .iter()
            .filter(|f| f.use_in_filter)
            .filter_map(|f| {
                let value = query.get(&f.key)?.trim();
                (!value.is_empty()).then(|| (f.id, value.to_owned()))
            })
            .collect();
        selected.sort_by_key(|(id, _)| *id);
        Self { selected }
    }

    /// Whether no feature value was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected `(feature, value)` pairs, ordered by feature id.
    #[must_use]
    pub fn selected(&self) -> &[(FeatureId, String)] {
        &self.selected
    }

    /// The selected value for a feature, if any.
    #[must_use]
    pub fn value_for(&self, feature: FeatureId) -> Option<&str> {
        self.selected
            .iter()
            .find(|(id, _)| *id == feature)
            .map(|(_, value)| value.as_str())
    }

    /// Feature ids and values as parallel vectors, for `unnest` binds.
    #[must_use]
    pub fn to_columns(&self) -> (Vec<i64>, Vec<String>) {
        self.selected
            .iter()
            .map(|(id, value)| (id.as_i64(), value.clone()))
            .unzip()
    }
}

/// Build the facets for a category page.
///
/// `choices` maps each filterable feature to its allowed values, either from
/// validators or from the distinct values stored on products.
#[must_use]
pub fn facets(
    features: &[CategoryFeature],
    choices: &HashMap<FeatureId, Vec<String>>,
    filter: &FeatureFilter,
) -> Vec<FeatureFacet> {
    let mut filterable: Vec<&CategoryFeature> =
        features.iter().filter(|f| f.use_in_filter).collect();
    filterable.sort_by_key(|f| (f.position, f.id));

    filterable
        .into_iter()
        .map(|f| FeatureFacet {
            name: f.name.clone(),
            key: f.key.clone(),
            unit: f.unit.clone(),
            choices: choices.get(&f.id).cloned().unwrap_or_default(),
            selected: filter.value_for(f.id).map(str::to_owned),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(id: i64, key: &str, position: i32, use_in_filter: bool) -> CategoryFeature {
        CategoryFeature {
            id: FeatureId::new(id),
            category_id: CategoryId::new(1),
            name: key.replace('_', " "),
            key: key.to_owned(),
            unit: None,
            use_in_filter,
            position,
        }
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_filter_ignores_unknown_and_unfilterable_keys() {
        let features = vec![
            feature(1, "ram", 1, true),
            feature(2, "sd", 2, false),
        ];
        let filter = FeatureFilter::from_query(
            &features,
            &query(&[("ram", "8"), ("sd", "yes"), ("page", "2"), ("color", "red")]),
        );

        assert_eq!(filter.selected(), &[(FeatureId::new(1), "8".to_owned())]);
        assert_eq!(filter.value_for(FeatureId::new(1)), Some("8"));
        assert_eq!(filter.value_for(FeatureId::new(2)), None);
    }

    #[test]
    fn test_filter_skips_blank_values() {
        let features = vec![feature(1, "ram", 1, true)];
        let filter = FeatureFilter::from_query(&features, &query(&[("ram", "  ")]));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_filter_columns() {
        let features = vec![feature(2, "cpu", 1, true), feature(1, "ram", 2, true)];
        let filter =
            FeatureFilter::from_query(&features, &query(&[("ram", "16"), ("cpu", "i7")]));
        let (ids, values) = filter.to_columns();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(values, vec!["16".to_owned(), "i7".to_owned()]);
    }

    #[test]
    fn test_spec_table_orders_by_position_and_omits_missing() {
        let mut display = feature(1, "display", 2, true);
        display.unit = Some("inch".to_owned());
        let features = vec![
            display,
            feature(2, "processor", 1, false),
            feature(3, "sd_volume_max", 3, false),
            feature(4, "battery", 4, false),
        ];
        let values: HashMap<FeatureId, String> = [
            (FeatureId::new(1), "15.6".to_owned()),
            (FeatureId::new(2), "Intel Core i5".to_owned()),
            (FeatureId::new(4), " ".to_owned()),
        ]
        .into_iter()
        .collect();

        let rows = spec_table(&features, &values);
        assert_eq!(
            rows,
            vec![
                SpecRow {
                    name: "processor".to_owned(),
                    value: "Intel Core i5".to_owned(),
                },
                SpecRow {
                    name: "display".to_owned(),
                    value: "15.6 inch".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn test_facets_mark_selection() {
        let features = vec![feature(1, "ram", 1, true), feature(2, "sd", 2, false)];
        let choices: HashMap<FeatureId, Vec<String>> =
            [(FeatureId::new(1), vec!["8".to_owned(), "16".to_owned()])]
                .into_iter()
                .collect();
        let filter = FeatureFilter::from_query(&features, &query(&[("ram", "16")]));

        let facets = facets(&features, &choices, &filter);
        assert_eq!(facets.len(), 1);
        assert!(facets[0].is_selected("16"));
        assert!(!facets[0].is_selected("8"));
    }
}
