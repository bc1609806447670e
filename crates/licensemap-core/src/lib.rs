// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # licensemap-core
//!
//! License allocation engine: maps the capacity of license agreements and
//! contracts onto the hosts and clusters that consume licensed features.
//!
//! This crate is `no_std`-compatible (requires `alloc`).  Enable the `std`
//! feature (on by default) to lift that restriction and gain access to
//! standard-library conveniences.
//!
//! ## Architecture
//!
//! ```text
//! AllocationEngine<I: Inventory>
//!   ├── Inventory       : grants, usage, license types, cluster members
//!   ├── UsageLedger     : one arena of usage records, shared by every grant
//!   ├── allocate()      : sort → direct + cluster sharing → basket → tally
//!   ├── summarize()     : per-license-type compliance rows
//!   └── GrantFilter     : search over the annotated grants
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use licensemap_core::{
//!     config::Config,
//!     engine::AllocationEngine,
//!     grant::{Agreement, Grant},
//!     inventory::InMemoryInventory,
//!     types::{LicenseMetric, LicenseType, UsageRecord},
//! };
//!
//! let mut inventory = InMemoryInventory::new();
//! inventory.add_license_type(LicenseType::new("L1", "Partitioning", LicenseMetric::ProcessorPerpetual));
//! inventory.add_agreement(Agreement::new("AG-1", "L1").with_available_per_core(5.0).with_hosts(&["db-01"]));
//! inventory.add_usage(UsageRecord::host("L1", "db-01", 3.0));
//!
//! let engine = AllocationEngine::new(Config::default(), inventory);
//! let outcome = engine.agreements().unwrap();
//!
//! assert_eq!(outcome.grants[0].capacity.hosts[0].covered_licenses_count, 3.0);
//! assert_eq!(outcome.grants[0].capacity.available_per_core, 2.0);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod allocation;
pub mod config;
pub mod config_loader;
pub mod engine;
pub mod error;
pub mod filter;
pub mod grant;
pub mod inventory;
pub mod ordering;
pub mod report;
pub mod types;
pub mod usage;

// Re-export the most commonly used items at the crate root so consumers can
// write `use licensemap_core::AllocationEngine;` instead of the fully
// qualified path.
pub use allocation::{allocate, has_available_licenses, AllocationPolicy, RunStats};
pub use config::Config;
pub use engine::{AllocationEngine, AllocationOutcome};
pub use error::{AllocationError, InventoryError};
pub use filter::GrantFilter;
pub use grant::{Agreement, ClusterCharge, Contract, Grant, GrantKind};
pub use inventory::{InMemoryInventory, Inventory, InventorySnapshot};
pub use report::{LicenseCompliance, Supply};
pub use types::{AssociatedHost, ClusterMembership, ConsumerKind, LicenseMetric, LicenseType, UsageRecord};
pub use usage::UsageLedger;
