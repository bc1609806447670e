// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Allocation engine: the top-level composition of one allocation request.
//!
//! [`AllocationEngine`] owns a [`Config`] and an [`Inventory`].  It holds no
//! mutable state: every call loads a fresh snapshot, allocates it from
//! scratch and hands the annotated grants back, so concurrent requests never
//! observe each other.
//!
//! ## Evaluation Order
//!
//! 1. **Load**: list the grants, then the usage.  Either failure aborts.
//! 2. **Clusters**: resolve the membership of every cluster that appears in
//!    the usage.  Any lookup failure aborts the run; cluster sharing cannot
//!    be guessed.
//! 3. **License types**: resolve each grant's license type and copy its
//!    description fields.  Unknown types are logged, reported as warnings,
//!    and allocated with an unknown metric.
//! 4. **Allocate**: [`allocate`] with the grant kind's [`ClusterCharge`]
//!    strategy.
//! 5. **Report**: per-license-type compliance rows.
//!
//! [`ClusterCharge`]: crate::grant::ClusterCharge

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::allocation::{allocate, LicenseTable, MembershipTable, RunStats};
use crate::config::Config;
use crate::error::AllocationError;
use crate::filter::GrantFilter;
use crate::grant::{Agreement, Contract, Grant};
use crate::inventory::Inventory;
use crate::report::{summarize, LicenseCompliance, Supply};
use crate::types::{ClusterMembership, UsageRecord};
use crate::usage::UsageLedger;

/// Result of one allocation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationOutcome<G> {
    /// Grants in priority order with every coverage figure populated.
    pub grants: Vec<G>,
    /// Usage records after allocation; `remaining` is what no grant covered.
    pub usage: Vec<UsageRecord>,
    /// One row per license type, sorted by ID.
    pub compliance: Vec<LicenseCompliance>,
    /// Non-fatal problems met while loading the run.
    #[serde(skip)]
    pub warnings: Vec<AllocationError>,
    #[serde(skip)]
    pub stats: RunStats,
}

/// Runs allocation requests against an [`Inventory`].
///
/// # Examples
///
/// ```rust
/// use licensemap_core::{
///     config::Config,
///     engine::AllocationEngine,
///     grant::{Agreement, Grant},
///     inventory::InMemoryInventory,
///     types::{LicenseMetric, LicenseType, UsageRecord},
/// };
///
/// let mut inventory = InMemoryInventory::new();
/// inventory.add_license_type(LicenseType::new("L1", "Diagnostics Pack", LicenseMetric::ProcessorPerpetual));
/// inventory.add_agreement(Agreement::new("AG-1", "L1").unlimited().with_hosts(&["db-01"]));
/// inventory.add_usage(UsageRecord::host("L1", "db-01", 3.0));
///
/// let engine = AllocationEngine::new(Config::default(), inventory);
/// let outcome = engine.agreements().unwrap();
///
/// let grant = &outcome.grants[0];
/// assert_eq!(grant.capacity.covered_licenses, 3.0);
/// assert_eq!(grant.capacity.hosts[0].covered_licenses_count, 3.0);
/// assert_eq!(grant.item_description, "Diagnostics Pack");
/// assert!(outcome.compliance[0].compliant);
/// ```
pub struct AllocationEngine<I: Inventory> {
    config: Config,
    inventory: I,
}

impl<I: Inventory> AllocationEngine<I> {
    /// Construct a new [`AllocationEngine`].
    pub fn new(config: Config, inventory: I) -> Self {
        Self { config, inventory }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Borrow the underlying inventory.
    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Allocate every agreement.
    ///
    /// # Errors
    ///
    /// Fails with the inventory's error, unchanged, if grants, usage or any
    /// cluster membership cannot be loaded.
    pub fn agreements(&self) -> Result<AllocationOutcome<Agreement>, AllocationError> {
        let grants = self
            .inventory
            .list_agreements()
            .map_err(AllocationError::GrantListingFailed)?;
        self.run(grants)
    }

    /// Allocate every contract.
    ///
    /// # Errors
    ///
    /// Same as [`agreements`](Self::agreements).
    pub fn contracts(&self) -> Result<AllocationOutcome<Contract>, AllocationError> {
        let grants = self
            .inventory
            .list_contracts()
            .map_err(AllocationError::GrantListingFailed)?;
        self.run(grants)
    }

    /// Allocate every agreement and keep those matching `filter`.
    pub fn search_agreements(&self, filter: &GrantFilter) -> Result<Vec<Agreement>, AllocationError> {
        Ok(filter.apply(self.agreements()?.grants))
    }

    /// Allocate every contract and keep those matching `filter`.
    pub fn search_contracts(&self, filter: &GrantFilter) -> Result<Vec<Contract>, AllocationError> {
        Ok(filter.apply(self.contracts()?.grants))
    }

    fn run<G: Grant>(&self, mut grants: Vec<G>) -> Result<AllocationOutcome<G>, AllocationError> {
        let usage = self
            .inventory
            .list_usage()
            .map_err(AllocationError::UsageCollectionFailed)?;
        let mut ledger = UsageLedger::from_records(usage);
        let memberships = self.resolve_memberships(&ledger)?;
        let (license_types, warnings) = self.resolve_license_types(&mut grants);

        info!(
            kind = G::KIND.label(),
            grants = grants.len(),
            usage = ledger.len(),
            clusters = memberships.len(),
            "allocation started"
        );

        let supply = Supply::capture(&grants, &license_types);
        let policy = self.config.policy_for(G::KIND);
        let stats = allocate(&mut grants, &mut ledger, &license_types, &memberships, policy);
        let compliance = summarize(supply, &ledger);

        info!(
            kind = G::KIND.label(),
            direct = stats.direct_covered,
            clusters = stats.cluster_charged,
            basket = stats.basket_covered,
            non_compliant = compliance.iter().filter(|row| !row.compliant).count(),
            "allocation finished"
        );

        Ok(AllocationOutcome {
            grants,
            usage: ledger.into_records(),
            compliance,
            warnings,
            stats,
        })
    }

    fn resolve_memberships(&self, ledger: &UsageLedger) -> Result<MembershipTable, AllocationError> {
        let mut memberships = MembershipTable::new();
        for cluster in ledger.cluster_names() {
            let hosts = self
                .inventory
                .cluster_members(cluster)
                .map_err(|source| AllocationError::ClusterLookupFailed {
                    cluster: cluster.into(),
                    source,
                })?;
            memberships.insert(
                cluster.into(),
                ClusterMembership {
                    cluster: cluster.into(),
                    hosts,
                },
            );
        }
        Ok(memberships)
    }

    fn resolve_license_types<G: Grant>(&self, grants: &mut [G]) -> (LicenseTable, Vec<AllocationError>) {
        let mut table = LicenseTable::new();
        let mut missing: HashSet<String> = HashSet::new();
        let mut warnings = Vec::new();

        for grant in grants.iter_mut() {
            let license_type_id = grant.license_type_id();
            if !table.contains_key(license_type_id) && !missing.contains(license_type_id) {
                match self.inventory.license_type(license_type_id) {
                    Some(license_type) => {
                        table.insert(license_type_id.into(), license_type);
                    }
                    None => {
                        missing.insert(license_type_id.into());
                    }
                }
            }

            let license_type = table.get(grant.license_type_id()).cloned();
            match license_type {
                Some(license_type) => grant.enrich(&license_type),
                None => {
                    warn!(
                        kind = G::KIND.label(),
                        grant = %grant.id(),
                        license_type = %grant.license_type_id(),
                        "license type not found"
                    );
                    warnings.push(AllocationError::LicenseTypeNotFound {
                        grant_id: grant.id().into(),
                        license_type_id: grant.license_type_id().into(),
                    });
                }
            }
        }

        (table, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InventoryError;
    use crate::inventory::{InMemoryInventory, InjectedFailure};
    use crate::types::{LicenseMetric, LicenseType};

    fn inventory() -> InMemoryInventory {
        let mut inventory = InMemoryInventory::new();
        inventory.add_license_type(LicenseType::new("CPU", "Tuning Pack", LicenseMetric::ProcessorPerpetual));
        inventory.add_agreement(Agreement::new("AG-1", "CPU").with_available_per_core(8.0).with_hosts(&["db-01"]));
        inventory.add_contract(Contract::new("CT-1", "CPU").with_available_per_core(8.0).with_hosts(&["db-01"]));
        inventory.add_usage(UsageRecord::host("CPU", "db-01", 2.0));
        inventory.add_usage(UsageRecord::cluster("CPU", "rac", 4.0));
        inventory.add_cluster("rac", &["db-01"]);
        inventory
    }

    #[test]
    fn test_grant_kinds_use_their_cluster_charge() {
        let engine = AllocationEngine::new(Config::default(), inventory());

        let agreements = engine.agreements().expect("agreements");
        assert_eq!(agreements.grants[0].capacity.covered_licenses, 6.0);
        assert_eq!(agreements.grants[0].capacity.available_per_core, 2.0);

        let contracts = engine.contracts().expect("contracts");
        assert_eq!(contracts.grants[0].capacity.covered_licenses, 6.0);
        assert_eq!(contracts.grants[0].capacity.available_per_core, 6.0);
    }

    #[test]
    fn test_cluster_lookup_failure_aborts() {
        let mut inventory = inventory();
        inventory.inject_failure(InjectedFailure::Cluster("rac".into()));
        let engine = AllocationEngine::new(Config::default(), inventory);

        let error = engine.agreements().expect_err("must abort");
        assert!(matches!(
            error,
            AllocationError::ClusterLookupFailed { ref cluster, .. } if cluster == "rac"
        ));
    }

    #[test]
    fn test_listing_failures_are_propagated_unchanged() {
        let mut inventory = inventory();
        inventory.inject_failure(InjectedFailure::Contracts);
        inventory.inject_failure(InjectedFailure::Usage);
        let engine = AllocationEngine::new(Config::default(), inventory);

        assert_eq!(
            engine.contracts().expect_err("listing fails"),
            AllocationError::GrantListingFailed(InventoryError::new("injected failure: Contracts"))
        );
        assert!(matches!(
            engine.agreements().expect_err("usage fails"),
            AllocationError::UsageCollectionFailed(_)
        ));
    }

    #[test]
    fn test_unknown_license_type_is_a_warning() {
        let mut inventory = inventory();
        inventory.add_agreement(Agreement::new("AG-2", "GONE").with_available_per_core(1.0));
        let engine = AllocationEngine::new(Config::default(), inventory);

        let outcome = engine.agreements().expect("non-fatal");
        assert_eq!(
            outcome.warnings,
            vec![AllocationError::LicenseTypeNotFound {
                grant_id: "AG-2".into(),
                license_type_id: "GONE".into(),
            }]
        );
        let orphan = outcome
            .grants
            .iter()
            .find(|grant| grant.agreement_id == "AG-2")
            .expect("still returned");
        assert!(orphan.item_description.is_empty());
        assert_eq!(orphan.metric, None);
    }

    #[test]
    fn test_search_filters_after_allocation() {
        let engine = AllocationEngine::new(Config::default(), inventory());
        let filter = GrantFilter { covered_licenses_gte: 6.0, ..GrantFilter::default() };
        assert_eq!(engine.search_agreements(&filter).expect("search").len(), 1);

        let filter = GrantFilter { covered_licenses_gte: 7.0, ..GrantFilter::default() };
        assert!(engine.search_contracts(&filter).expect("search").is_empty());
    }
}
