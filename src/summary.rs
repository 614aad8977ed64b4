//! Dashboard metrics over the cleaned dataset

use crate::types::CleanedDataset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of categories listed by default
pub const DEFAULT_TOP_CATEGORIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryViews {
    pub category: String,
    pub views: usize,
}

/// Headline numbers of a cleaned dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub unique_identities: usize,
    pub total_views: usize,
    pub avg_views_per_identity: f64,
    /// Most viewed categories, ties broken by name
    pub top_categories: Vec<CategoryViews>,
}

impl DatasetSummary {
    pub fn compute(dataset: &CleanedDataset, top: usize) -> Self {
        let unique_identities = dataset.identities().len();
        let total_views = dataset.len();
        let avg_views_per_identity = if unique_identities > 0 {
            total_views as f64 / unique_identities as f64
        } else {
            0.0
        };

        let mut views: BTreeMap<&str, usize> = BTreeMap::new();
        for record in &dataset.records {
            *views.entry(record.category.as_str()).or_default() += 1;
        }
        let mut ranked: Vec<(&str, usize)> = views.into_iter().collect();
        // BTreeMap order is by name; the stable sort keeps it for ties.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        Self {
            unique_identities,
            total_views,
            avg_views_per_identity,
            top_categories: ranked
                .into_iter()
                .take(top)
                .map(|(category, views)| CategoryViews {
                    category: category.to_string(),
                    views,
                })
                .collect(),
        }
    }
}
