// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Grant filtering.
//!
//! A grant matches a [`GrantFilter`] iff every populated field matches:
//! text fields as case-insensitive substrings, flags exactly, and numeric
//! fields as inclusive bounds where [`GrantFilter::UNBOUNDED`] (`-1`) means
//! "no bound".  Filtering never mutates the grants.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::grant::Grant;

/// Search criteria for annotated grants.
///
/// # Examples
///
/// ```rust
/// use licensemap_core::filter::GrantFilter;
/// use licensemap_core::grant::{Agreement, Grant};
///
/// let grants = vec![
///     Agreement::new("AG-100", "A90611").with_available_per_core(4.0),
///     Agreement::new("AG-200", "A90649").basket(),
/// ];
///
/// let filter = GrantFilter {
///     reference: Some("ag-1".into()),
///     available_per_core_gte: 2.0,
///     ..GrantFilter::default()
/// };
/// let matched = filter.apply(grants);
/// assert_eq!(matched.len(), 1);
/// assert_eq!(matched[0].agreement_id, "AG-100");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantFilter {
    /// Agreement ID or contract number.
    pub reference: Option<String>,
    pub csi: Option<String>,
    pub license_type_id: Option<String>,
    pub item_description: Option<String>,
    /// Matched against the metric label, e.g. "Named User Plus".
    pub metric: Option<String>,

    pub unlimited: Option<bool>,
    pub basket: Option<bool>,
    pub restricted: Option<bool>,

    pub available_per_core_gte: f64,
    pub available_per_core_lte: f64,
    pub available_per_user_gte: f64,
    pub available_per_user_lte: f64,
    pub covered_licenses_gte: f64,
    pub covered_licenses_lte: f64,
}

impl Default for GrantFilter {
    fn default() -> Self {
        Self {
            reference: None,
            csi: None,
            license_type_id: None,
            item_description: None,
            metric: None,
            unlimited: None,
            basket: None,
            restricted: None,
            available_per_core_gte: Self::UNBOUNDED,
            available_per_core_lte: Self::UNBOUNDED,
            available_per_user_gte: Self::UNBOUNDED,
            available_per_user_lte: Self::UNBOUNDED,
            covered_licenses_gte: Self::UNBOUNDED,
            covered_licenses_lte: Self::UNBOUNDED,
        }
    }
}

impl GrantFilter {
    /// Sentinel for an unset numeric bound.
    pub const UNBOUNDED: f64 = -1.0;

    /// Whether `grant` satisfies every populated criterion.
    pub fn matches<G: Grant>(&self, grant: &G) -> bool {
        let capacity = grant.capacity();
        let metric = grant.metric().map_or("", |metric| metric.label());

        contains(&self.reference, grant.reference())
            && contains(&self.csi, grant.csi())
            && contains(&self.license_type_id, grant.license_type_id())
            && contains(&self.item_description, grant.item_description())
            && contains(&self.metric, metric)
            && flag(self.unlimited, capacity.unlimited)
            && flag(self.basket, capacity.basket)
            && flag(self.restricted, capacity.restricted)
            && within(
                capacity.available_per_core,
                self.available_per_core_gte,
                self.available_per_core_lte,
            )
            && within(
                capacity.available_per_user,
                self.available_per_user_gte,
                self.available_per_user_lte,
            )
            && within(
                capacity.covered_licenses,
                self.covered_licenses_gte,
                self.covered_licenses_lte,
            )
    }

    /// Keep the grants that match, in their original order.
    pub fn apply<G: Grant>(&self, grants: Vec<G>) -> Vec<G> {
        grants.into_iter().filter(|grant| self.matches(grant)).collect()
    }
}

fn contains(needle: &Option<String>, haystack: &str) -> bool {
    match needle {
        None => true,
        Some(needle) if needle.is_empty() => true,
        Some(needle) => haystack
            .to_lowercase()
            .contains(needle.to_lowercase().as_str()),
    }
}

fn flag(expected: Option<bool>, actual: bool) -> bool {
    expected.map_or(true, |expected| expected == actual)
}

fn within(value: f64, gte: f64, lte: f64) -> bool {
    (gte == GrantFilter::UNBOUNDED || value >= gte)
        && (lte == GrantFilter::UNBOUNDED || value <= lte)
}
