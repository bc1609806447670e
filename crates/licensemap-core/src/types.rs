// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Shared data types used across the allocation engine.
//!
//! All types implement [`Clone`], [`Debug`], [`serde::Serialize`], and
//! [`serde::Deserialize`] so that snapshots handed over by the inventory
//! collaborator and the annotated results handed back to the reporting layer
//! need no additional conversion step.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

/// Rounding factor applied to named-user-plus allocations by default.
pub const NAMED_USER_FACTOR: u32 = 25;

// ---------------------------------------------------------------------------
// License types
// ---------------------------------------------------------------------------

/// Unit in which a license type is counted.
///
/// Only the named-user-plus family changes allocation behaviour: those grants
/// draw on `available_per_user` in multiples of the rounding factor, every
/// other metric draws on `available_per_core` one unit at a time.
///
/// # Examples
///
/// ```rust
/// use licensemap_core::types::LicenseMetric;
///
/// assert!(LicenseMetric::NamedUserPlusPerpetual.is_named_user_plus());
/// assert!(!LicenseMetric::ProcessorPerpetual.is_named_user_plus());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseMetric {
    #[serde(rename = "Processor Perpetual")]
    ProcessorPerpetual,
    #[serde(rename = "Named User Plus Perpetual")]
    NamedUserPlusPerpetual,
    #[serde(rename = "Computer Perpetual")]
    ComputerPerpetual,
    #[serde(rename = "Processor Term")]
    ProcessorTerm,
    #[serde(rename = "Named User Plus Term")]
    NamedUserPlusTerm,
    #[serde(rename = "Other")]
    Other,
}

impl LicenseMetric {
    /// Whether allocations under this metric are counted per named user.
    pub fn is_named_user_plus(self) -> bool {
        matches!(
            self,
            LicenseMetric::NamedUserPlusPerpetual | LicenseMetric::NamedUserPlusTerm
        )
    }

    /// Human-readable label, identical to the serialised form.
    pub fn label(self) -> &'static str {
        match self {
            LicenseMetric::ProcessorPerpetual     => "Processor Perpetual",
            LicenseMetric::NamedUserPlusPerpetual => "Named User Plus Perpetual",
            LicenseMetric::ComputerPerpetual      => "Computer Perpetual",
            LicenseMetric::ProcessorTerm          => "Processor Term",
            LicenseMetric::NamedUserPlusTerm      => "Named User Plus Term",
            LicenseMetric::Other                  => "Other",
        }
    }

    /// Default rounding factor for the metric.
    pub fn default_factor(self) -> u32 {
        if self.is_named_user_plus() {
            NAMED_USER_FACTOR
        } else {
            1
        }
    }
}

/// One row of the license type table: identifier, metric, rounding factor.
///
/// # Examples
///
/// ```rust
/// use licensemap_core::types::{LicenseMetric, LicenseType};
///
/// let nup = LicenseType::new("A90611", "Oracle Database Enterprise Edition", LicenseMetric::NamedUserPlusPerpetual);
/// assert_eq!(nup.factor, 25);
///
/// let cpu = LicenseType::new("A90649", "Oracle Partitioning", LicenseMetric::ProcessorPerpetual);
/// assert_eq!(cpu.factor, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseType {
    /// Stable identifier (part number) referenced by grants and usage.
    pub id: String,
    /// Product description copied onto grants during enrichment.
    pub description: String,
    /// Counting unit.
    pub metric: LicenseMetric,
    /// Named-user-plus allocations are floored to multiples of this value.
    /// `0` means "use the engine default".
    #[serde(default)]
    pub factor: u32,
}

impl LicenseType {
    /// Build a license type whose factor is derived from its metric.
    pub fn new(id: &str, description: &str, metric: LicenseMetric) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            metric,
            factor: metric.default_factor(),
        }
    }
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

/// Whether a usage record belongs to a single host or to a whole cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumerKind {
    Host,
    Cluster,
}

/// One consumer's demand for one license type.
///
/// `original` is the measured demand and never changes.  `remaining` starts
/// at the same value and is decremented as grants cover it, so it always
/// stays within `0..=original`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// License type consumed.
    pub license_type_id: String,
    /// Hostname or cluster name.
    pub name: String,
    /// Host or cluster.
    pub kind: ConsumerKind,
    /// Demand as measured by the usage collector.
    pub original: f64,
    /// Demand not yet covered by any grant.
    pub remaining: f64,
}

impl UsageRecord {
    /// Create a fresh, uncovered usage record.
    ///
    /// Negative or non-finite amounts are clamped to `0`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use licensemap_core::types::{ConsumerKind, UsageRecord};
    ///
    /// let usage = UsageRecord::new("A90611", "db-01", ConsumerKind::Host, 4.0);
    /// assert_eq!(usage.remaining, 4.0);
    ///
    /// let broken = UsageRecord::new("A90611", "db-02", ConsumerKind::Host, -3.0);
    /// assert_eq!(broken.original, 0.0);
    /// ```
    pub fn new(license_type_id: &str, name: &str, kind: ConsumerKind, amount: f64) -> Self {
        let amount = sanitize_amount(amount);
        Self {
            license_type_id: license_type_id.into(),
            name: name.into(),
            kind,
            original: amount,
            remaining: amount,
        }
    }

    /// Shorthand for a host-level record.
    pub fn host(license_type_id: &str, hostname: &str, amount: f64) -> Self {
        Self::new(license_type_id, hostname, ConsumerKind::Host, amount)
    }

    /// Shorthand for a cluster-level record.
    pub fn cluster(license_type_id: &str, cluster: &str, amount: f64) -> Self {
        Self::new(license_type_id, cluster, ConsumerKind::Cluster, amount)
    }

    /// Demand covered so far, across every grant.
    pub fn covered(&self) -> f64 {
        self.original - self.remaining
    }

    /// Take `amount` off `remaining`, never going below zero.
    pub(crate) fn consume(&mut self, amount: f64) {
        self.remaining = (self.remaining - amount).max(0.0);
    }
}

/// Clamp an incoming amount into the non-negative finite range.
pub(crate) fn sanitize_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Grants
// ---------------------------------------------------------------------------

/// A host explicitly associated with a grant, with its coverage figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociatedHost {
    pub hostname: String,
    /// Units of this host's usage covered by the owning grant.
    #[serde(default)]
    pub covered_licenses_count: f64,
    /// Units of this host's usage covered by all grants together.
    #[serde(default)]
    pub total_covered_licenses_count: f64,
    /// The host's measured demand.
    #[serde(default)]
    pub consumed_licenses_count: f64,
}

impl AssociatedHost {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.into(),
            covered_licenses_count: 0.0,
            total_covered_licenses_count: 0.0,
            consumed_licenses_count: 0.0,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.covered_licenses_count = 0.0;
        self.total_covered_licenses_count = 0.0;
        self.consumed_licenses_count = 0.0;
    }
}

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

/// Ordered member hostnames of one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMembership {
    pub cluster: String,
    pub hosts: Vec<String>,
}

impl ClusterMembership {
    pub fn contains(&self, hostname: &str) -> bool {
        self.hosts.iter().any(|host| host == hostname)
    }
}
