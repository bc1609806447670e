// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Inventory abstraction for the allocation engine.
//!
//! The [`Inventory`] trait is the single interface between the engine and
//! whatever stores grants, collects usage and knows the cluster topology.
//! This crate ships [`InMemoryInventory`] for development and testing.
//! Database-backed implementations live in downstream crates so that this
//! core crate remains `no_std`.
//!
//! # Implementing `Inventory`
//!
//! ```rust,no_run
//! use licensemap_core::error::InventoryError;
//! use licensemap_core::grant::{Agreement, Contract};
//! use licensemap_core::inventory::Inventory;
//! use licensemap_core::types::{LicenseType, UsageRecord};
//!
//! struct MyInventory;
//!
//! impl Inventory for MyInventory {
//!     fn list_agreements(&self) -> Result<Vec<Agreement>, InventoryError> {
//!         Ok(Vec::new()) // read from your backend
//!     }
//!     fn list_contracts(&self) -> Result<Vec<Contract>, InventoryError> { Ok(Vec::new()) }
//!     fn list_usage(&self) -> Result<Vec<UsageRecord>, InventoryError> { Ok(Vec::new()) }
//!     fn license_type(&self, _id: &str) -> Option<LicenseType> { None }
//!     fn cluster_members(&self, _cluster: &str) -> Result<Vec<String>, InventoryError> {
//!         Ok(Vec::new())
//!     }
//! }
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::InventoryError;
use crate::grant::{Agreement, Contract};
use crate::types::{ClusterMembership, LicenseType, UsageRecord};

// ---------------------------------------------------------------------------
// Inventory trait
// ---------------------------------------------------------------------------

/// Read-only collaborator that feeds one allocation run.
///
/// Every call returns owned values: the engine mutates what it receives and
/// the inventory's own state is never touched.  Implementations MUST be
/// `Send + Sync` so one inventory can serve concurrent requests, each of
/// which loads its own snapshot.
pub trait Inventory: Send + Sync {
    /// All agreements, unsorted, as stored.
    fn list_agreements(&self) -> Result<Vec<Agreement>, InventoryError>;

    /// All contracts, unsorted, as stored.
    fn list_contracts(&self) -> Result<Vec<Contract>, InventoryError>;

    /// Current usage of every license type by every host and cluster.
    fn list_usage(&self) -> Result<Vec<UsageRecord>, InventoryError>;

    /// Look up one row of the license type table.
    fn license_type(&self, id: &str) -> Option<LicenseType>;

    /// Member hostnames of `cluster`.  Unknown clusters have no members.
    fn cluster_members(&self, cluster: &str) -> Result<Vec<String>, InventoryError>;
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything an inventory hands to the engine, as one serialisable value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub agreements: Vec<Agreement>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
    #[serde(default)]
    pub usage: Vec<UsageRecord>,
    #[serde(default)]
    pub license_types: Vec<LicenseType>,
    #[serde(default)]
    pub clusters: Vec<ClusterMembership>,
}

// ---------------------------------------------------------------------------
// InMemoryInventory
// ---------------------------------------------------------------------------

/// Which [`InMemoryInventory`] call should fail, for exercising error paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    Agreements,
    Contracts,
    Usage,
    Cluster(String),
}

/// A volatile [`Inventory`] backed by [`hashbrown::HashMap`] lookups.
///
/// # Examples
///
/// ```rust
/// use licensemap_core::inventory::{InMemoryInventory, Inventory};
/// use licensemap_core::types::{LicenseMetric, LicenseType, UsageRecord};
///
/// let mut inventory = InMemoryInventory::new();
/// inventory.add_license_type(LicenseType::new("L1", "Tuning Pack", LicenseMetric::ProcessorPerpetual));
/// inventory.add_usage(UsageRecord::host("L1", "db-01", 2.0));
/// inventory.add_cluster("rac-01", &["db-01", "db-02"]);
///
/// assert!(inventory.license_type("L1").is_some());
/// assert_eq!(inventory.list_usage().unwrap().len(), 1);
/// assert_eq!(inventory.cluster_members("rac-01").unwrap().len(), 2);
/// assert!(inventory.cluster_members("unknown").unwrap().is_empty());
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryInventory {
    agreements: Vec<Agreement>,
    contracts: Vec<Contract>,
    usage: Vec<UsageRecord>,
    /// Key: license type ID.
    license_types: HashMap<String, LicenseType>,
    /// Key: cluster name → ordered member hostnames.
    clusters: HashMap<String, Vec<String>>,
    failures: Vec<InjectedFailure>,
}

impl InMemoryInventory {
    /// Create a new, empty [`InMemoryInventory`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an inventory holding everything in `snapshot`.
    pub fn from_snapshot(snapshot: InventorySnapshot) -> Self {
        let mut inventory = Self {
            agreements: snapshot.agreements,
            contracts: snapshot.contracts,
            usage: snapshot.usage,
            ..Self::default()
        };
        for license_type in snapshot.license_types {
            inventory.add_license_type(license_type);
        }
        for membership in snapshot.clusters {
            inventory.clusters.insert(membership.cluster, membership.hosts);
        }
        inventory
    }

    /// Parse an [`InventorySnapshot`] from JSON.
    ///
    /// # Errors
    ///
    /// Returns an [`InventoryError`] if the JSON does not match the snapshot
    /// schema.
    pub fn from_json(json: &str) -> Result<Self, InventoryError> {
        let snapshot: InventorySnapshot = serde_json::from_str(json).map_err(|error| {
            InventoryError::new(alloc::format!("inventory snapshot parse error: {}", error))
        })?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn add_agreement(&mut self, agreement: Agreement) {
        self.agreements.push(agreement);
    }

    pub fn add_contract(&mut self, contract: Contract) {
        self.contracts.push(contract);
    }

    pub fn add_usage(&mut self, usage: UsageRecord) {
        self.usage.push(usage);
    }

    pub fn add_license_type(&mut self, license_type: LicenseType) {
        self.license_types.insert(license_type.id.clone(), license_type);
    }

    pub fn add_cluster(&mut self, cluster: &str, hosts: &[&str]) {
        self.clusters
            .insert(cluster.into(), hosts.iter().map(|host| String::from(*host)).collect());
    }

    /// Make the given call fail from now on.
    pub fn inject_failure(&mut self, failure: InjectedFailure) {
        self.failures.push(failure);
    }

    fn check(&self, failure: &InjectedFailure) -> Result<(), InventoryError> {
        if self.failures.contains(failure) {
            return Err(InventoryError::new(alloc::format!("injected failure: {:?}", failure)));
        }
        Ok(())
    }
}

impl Inventory for InMemoryInventory {
    fn list_agreements(&self) -> Result<Vec<Agreement>, InventoryError> {
        self.check(&InjectedFailure::Agreements)?;
        Ok(self.agreements.clone())
    }

    fn list_contracts(&self) -> Result<Vec<Contract>, InventoryError> {
        self.check(&InjectedFailure::Contracts)?;
        Ok(self.contracts.clone())
    }

    fn list_usage(&self) -> Result<Vec<UsageRecord>, InventoryError> {
        self.check(&InjectedFailure::Usage)?;
        Ok(self.usage.clone())
    }

    fn license_type(&self, id: &str) -> Option<LicenseType> {
        self.license_types.get(id).cloned()
    }

    fn cluster_members(&self, cluster: &str) -> Result<Vec<String>, InventoryError> {
        self.check(&InjectedFailure::Cluster(cluster.into()))?;
        Ok(self.clusters.get(cluster).cloned().unwrap_or_default())
    }
}
