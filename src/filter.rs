use crate::types::{FilterState, Organization, TypeBucket};
use anyhow::{Context, Result};
use std::collections::BTreeSet;

pub fn matches(org: &Organization, filter: &FilterState) -> bool {
    let type_ok = match filter.type_bucket {
        None => true,
        Some(TypeBucket::Startup) => org.is_startup(),
        Some(TypeBucket::Other) => !org.is_startup(),
    };
    if !type_ok {
        return false;
    }

    if filter.type_bucket == Some(TypeBucket::Other) || filter.categories.is_empty() {
        return true;
    }
    filter.categories.contains(&org.category)
}

/// Indices of every matching organization, recomputed over the full list.
pub fn apply_filter(records: &[Organization], filter: &FilterState) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, org)| matches(org, filter))
        .map(|(i, _)| i)
        .collect()
}

/// Distinct categories offered inside the startup bucket, sorted.
pub fn available_categories(records: &[Organization]) -> Vec<String> {
    records
        .iter()
        .filter(|org| org.is_startup() && !org.category.is_empty())
        .map(|org| org.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Builds a filter from `type=startup&category=A&category=B` style pairs.
pub fn filter_from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<FilterState> {
    let mut type_bucket = None;
    let mut categories = Vec::new();

    for (key, value) in pairs {
        match key {
            "type" if !value.trim().is_empty() => {
                type_bucket = Some(value.parse::<TypeBucket>().context("Invalid 'type' parameter")?);
            }
            "category" if !value.trim().is_empty() => categories.push(value.trim().to_string()),
            _ => {}
        }
    }

    Ok(FilterState::new(type_bucket, categories))
}
