// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # Basic Allocation Example
//!
//! Allocates a small estate of agreements and contracts against host and
//! cluster usage using the in-memory inventory.  Run with:
//!
//! ```bash
//! RUST_LOG=licensemap_core=debug cargo run --example basic
//! ```

use licensemap_core::{
    config::Config,
    engine::{AllocationEngine, AllocationOutcome},
    filter::GrantFilter,
    grant::{Agreement, Contract, Grant},
    inventory::InMemoryInventory,
    types::{LicenseMetric, LicenseType, UsageRecord},
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("licensemap: Basic Example\n");

    // -----------------------------------------------------------------------
    // 1. License types
    // -----------------------------------------------------------------------
    let mut inventory = InMemoryInventory::new();
    inventory.add_license_type(LicenseType::new(
        "A90611",
        "Oracle Database Enterprise Edition",
        LicenseMetric::NamedUserPlusPerpetual,
    ));
    inventory.add_license_type(LicenseType::new("A90649", "Diagnostics Pack", LicenseMetric::ProcessorPerpetual));
    inventory.add_license_type(LicenseType::new("A91110", "Real Application Clusters", LicenseMetric::ProcessorPerpetual));

    // -----------------------------------------------------------------------
    // 2. Grants
    // -----------------------------------------------------------------------
    inventory.add_agreement(
        Agreement::new("AG-2019-001", "A90611")
            .with_available_per_user(250.0)
            .with_hosts(&["db-prod-01", "db-prod-02"]),
    );
    inventory.add_agreement(
        Agreement::new("AG-2021-014", "A90649")
            .with_available_per_core(8.0)
            .with_hosts(&["db-prod-01"]),
    );
    inventory.add_agreement(Agreement::new("AG-ULA", "A90649").with_available_per_core(4.0).basket());
    inventory.add_contract(
        Contract::new("CSI-77310", "A91110")
            .with_available_per_core(16.0)
            .with_hosts(&["db-prod-01", "db-prod-02"]),
    );

    // -----------------------------------------------------------------------
    // 3. Usage
    // -----------------------------------------------------------------------
    inventory.add_usage(UsageRecord::host("A90611", "db-prod-01", 40.0));
    inventory.add_usage(UsageRecord::host("A90611", "db-prod-02", 15.0));
    inventory.add_usage(UsageRecord::host("A90649", "db-prod-01", 6.0));
    inventory.add_usage(UsageRecord::host("A90649", "db-test-07", 5.0));
    inventory.add_usage(UsageRecord::cluster("A91110", "rac-prod", 12.0));
    inventory.add_cluster("rac-prod", &["db-prod-01", "db-prod-02"]);

    let engine = AllocationEngine::new(Config::default(), inventory);

    // -----------------------------------------------------------------------
    // 4. Allocate
    // -----------------------------------------------------------------------
    match engine.agreements() {
        Ok(outcome) => print_outcome("Agreements", &outcome),
        Err(error) => println!("agreement allocation failed: {error}"),
    }
    match engine.contracts() {
        Ok(outcome) => print_outcome("Contracts", &outcome),
        Err(error) => println!("contract allocation failed: {error}"),
    }

    // -----------------------------------------------------------------------
    // 5. Search
    // -----------------------------------------------------------------------
    let filter = GrantFilter {
        basket: Some(true),
        ..GrantFilter::default()
    };
    match engine.search_agreements(&filter) {
        Ok(matched) => {
            println!("Basket agreements: {}", matched.len());
            for grant in &matched {
                println!(
                    "  {} covered={:.0} left={:.0}",
                    grant.reference(),
                    grant.capacity().covered_licenses,
                    grant.capacity().available(grant.metric())
                );
            }
        }
        Err(error) => println!("search failed: {error}"),
    }

    println!("\nDone.");
}

fn print_outcome<G: Grant>(label: &str, outcome: &AllocationOutcome<G>) {
    println!("{label}:");
    for grant in &outcome.grants {
        let capacity = grant.capacity();
        println!(
            "  {} [{}] covered={:.0} left={:.0}{}",
            grant.reference(),
            grant.item_description(),
            capacity.covered_licenses,
            capacity.available(grant.metric()),
            if capacity.basket { " (basket)" } else { "" }
        );
        for host in &capacity.hosts {
            println!(
                "    {:<12} this grant={:.0} all grants={:.0} consumed={:.0}",
                host.hostname,
                host.covered_licenses_count,
                host.total_covered_licenses_count,
                host.consumed_licenses_count
            );
        }
    }
    for row in &outcome.compliance {
        println!(
            "  {} consumed={:.0} covered={:.0} {}",
            row.license_type_id,
            row.consumed,
            row.covered,
            if row.compliant { "ok" } else { "UNCOVERED" }
        );
    }
    for warning in &outcome.warnings {
        println!("  warning: {warning}");
    }
    println!();
}
