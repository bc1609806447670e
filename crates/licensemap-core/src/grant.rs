// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! License grants: agreements and contracts.
//!
//! Both grant kinds carry the same [`Capacity`] block and differ only in
//! their reference fields.  The allocation passes are written once against
//! the [`Grant`] trait; the one behavioural difference between the kinds
//! (whether a cluster-sharing charge eats into availability) is a
//! [`ClusterCharge`] strategy chosen through [`Config`](crate::config::Config).

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::types::{AssociatedHost, LicenseMetric, LicenseType};

/// How a cluster-sharing charge affects the charged grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterCharge {
    /// Cluster usage is added to `covered_licenses` and subtracted from the
    /// grant's availability.
    DecrementAvailability,
    /// Cluster usage is added to `covered_licenses` only.
    RecordOnly,
}

impl ClusterCharge {
    pub fn decrements_availability(self) -> bool {
        matches!(self, ClusterCharge::DecrementAvailability)
    }
}

/// The two kinds of grant the engine allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantKind {
    Agreement,
    Contract,
}

impl GrantKind {
    /// Short noun used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            GrantKind::Agreement => "agreement",
            GrantKind::Contract  => "contract",
        }
    }
}

/// Capacity, flags and host associations shared by every grant kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Capacity {
    /// Capacity is inexhaustible.
    #[serde(default)]
    pub unlimited: bool,
    /// Capacity may cover any consumer of the license type, associated or not.
    #[serde(default)]
    pub basket: bool,
    /// Cluster sharing is disabled for this grant.
    #[serde(default)]
    pub restricted: bool,
    #[serde(default)]
    pub available_per_core: f64,
    #[serde(default)]
    pub available_per_user: f64,
    /// Units covered by this grant in the current run.
    #[serde(default)]
    pub covered_licenses: f64,
    /// Explicitly associated hosts, in association order until sorted.
    #[serde(default)]
    pub hosts: Vec<AssociatedHost>,
}

impl Capacity {
    /// Availability in the unit of `metric`.  Unknown metrics count per core.
    pub fn available(&self, metric: Option<LicenseMetric>) -> f64 {
        if is_named_user_plus(metric) {
            self.available_per_user
        } else {
            self.available_per_core
        }
    }

    pub(crate) fn available_mut(&mut self, metric: Option<LicenseMetric>) -> &mut f64 {
        if is_named_user_plus(metric) {
            &mut self.available_per_user
        } else {
            &mut self.available_per_core
        }
    }

    /// Clear every figure the engine computes, keeping inputs intact.
    pub(crate) fn reset_coverage(&mut self) {
        self.covered_licenses = 0.0;
        for host in &mut self.hosts {
            host.reset();
        }
    }
}

pub(crate) fn is_named_user_plus(metric: Option<LicenseMetric>) -> bool {
    metric.map_or(false, LicenseMetric::is_named_user_plus)
}

/// Capability interface over agreements and contracts.
///
/// Identity accessors feed the filter; [`capacity`](Grant::capacity) and
/// [`capacity_mut`](Grant::capacity_mut) are all the allocation passes need.
pub trait Grant {
    const KIND: GrantKind;

    /// Storage identifier.
    fn id(&self) -> &str;
    /// Business reference: agreement ID or contract number.
    fn reference(&self) -> &str;
    fn csi(&self) -> &str;
    fn license_type_id(&self) -> &str;
    fn item_description(&self) -> &str;
    /// Metric resolved from the license type table, if found.
    fn metric(&self) -> Option<LicenseMetric>;

    fn capacity(&self) -> &Capacity;
    fn capacity_mut(&mut self) -> &mut Capacity;

    /// Copy description fields from the resolved license type.
    fn enrich(&mut self, license_type: &LicenseType);

    /// Associate hosts by name.
    fn with_hosts(mut self, hostnames: &[&str]) -> Self
    where
        Self: Sized,
    {
        self.capacity_mut()
            .hosts
            .extend(hostnames.iter().map(|name| AssociatedHost::new(name)));
        self
    }

    fn with_available_per_core(mut self, amount: f64) -> Self
    where
        Self: Sized,
    {
        self.capacity_mut().available_per_core = amount;
        self
    }

    fn with_available_per_user(mut self, amount: f64) -> Self
    where
        Self: Sized,
    {
        self.capacity_mut().available_per_user = amount;
        self
    }

    fn unlimited(mut self) -> Self
    where
        Self: Sized,
    {
        self.capacity_mut().unlimited = true;
        self
    }

    fn basket(mut self) -> Self
    where
        Self: Sized,
    {
        self.capacity_mut().basket = true;
        self
    }

    fn restricted(mut self) -> Self
    where
        Self: Sized,
    {
        self.capacity_mut().restricted = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Agreement
// ---------------------------------------------------------------------------

/// A license agreement.
///
/// # Examples
///
/// ```rust
/// use licensemap_core::grant::{Agreement, Grant};
///
/// let agreement = Agreement::new("AG-001", "A90611")
///     .with_available_per_core(10.0)
///     .with_hosts(&["db-01", "db-02"]);
///
/// assert_eq!(agreement.capacity().hosts.len(), 2);
/// assert!(!agreement.capacity().unlimited);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agreement {
    pub id: String,
    pub agreement_id: String,
    #[serde(default)]
    pub csi: String,
    pub license_type_id: String,
    #[serde(default)]
    pub reference_number: String,
    #[serde(default)]
    pub item_description: String,
    #[serde(default)]
    pub metric: Option<LicenseMetric>,
    #[serde(flatten)]
    pub capacity: Capacity,
}

impl Agreement {
    pub fn new(agreement_id: &str, license_type_id: &str) -> Self {
        Self {
            id: agreement_id.into(),
            agreement_id: agreement_id.into(),
            csi: String::new(),
            license_type_id: license_type_id.into(),
            reference_number: String::new(),
            item_description: String::new(),
            metric: None,
            capacity: Capacity::default(),
        }
    }
}

impl Grant for Agreement {
    const KIND: GrantKind = GrantKind::Agreement;

    fn id(&self) -> &str {
        &self.id
    }

    fn reference(&self) -> &str {
        &self.agreement_id
    }

    fn csi(&self) -> &str {
        &self.csi
    }

    fn license_type_id(&self) -> &str {
        &self.license_type_id
    }

    fn item_description(&self) -> &str {
        &self.item_description
    }

    fn metric(&self) -> Option<LicenseMetric> {
        self.metric
    }

    fn capacity(&self) -> &Capacity {
        &self.capacity
    }

    fn capacity_mut(&mut self) -> &mut Capacity {
        &mut self.capacity
    }

    fn enrich(&mut self, license_type: &LicenseType) {
        self.item_description = license_type.description.clone();
        self.metric = Some(license_type.metric);
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// A support contract bearing license capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub contract_number: String,
    #[serde(default)]
    pub csi: String,
    pub license_type_id: String,
    #[serde(default)]
    pub support_reference: String,
    #[serde(default)]
    pub item_description: String,
    #[serde(default)]
    pub metric: Option<LicenseMetric>,
    #[serde(flatten)]
    pub capacity: Capacity,
}

impl Contract {
    pub fn new(contract_number: &str, license_type_id: &str) -> Self {
        Self {
            id: contract_number.into(),
            contract_number: contract_number.into(),
            csi: String::new(),
            license_type_id: license_type_id.into(),
            support_reference: String::new(),
            item_description: String::new(),
            metric: None,
            capacity: Capacity::default(),
        }
    }
}

impl Grant for Contract {
    const KIND: GrantKind = GrantKind::Contract;

    fn id(&self) -> &str {
        &self.id
    }

    fn reference(&self) -> &str {
        &self.contract_number
    }

    fn csi(&self) -> &str {
        &self.csi
    }

    fn license_type_id(&self) -> &str {
        &self.license_type_id
    }

    fn item_description(&self) -> &str {
        &self.item_description
    }

    fn metric(&self) -> Option<LicenseMetric> {
        self.metric
    }

    fn capacity(&self) -> &Capacity {
        &self.capacity
    }

    fn capacity_mut(&mut self) -> &mut Capacity {
        &mut self.capacity
    }

    fn enrich(&mut self, license_type: &LicenseType) {
        self.item_description = license_type.description.clone();
        self.metric = Some(license_type.metric);
    }
}
