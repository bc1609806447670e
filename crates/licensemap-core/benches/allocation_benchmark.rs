// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Criterion benchmark suite for the allocation engine.
//!
//! Benchmarks cover:
//!
//! - The allocation passes over growing estates
//! - Cluster-heavy estates where most hosts share clusters
//! - A full engine run including license type and cluster resolution
//! - Filtering an annotated grant list
//!
//! Run with: `cargo bench --bench allocation_benchmark`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use licensemap_core::{
    allocation::{allocate, AllocationPolicy, LicenseTable, MembershipTable},
    config::Config,
    engine::AllocationEngine,
    filter::GrantFilter,
    grant::{Agreement, Grant},
    inventory::InMemoryInventory,
    types::{ClusterMembership, LicenseMetric, LicenseType, UsageRecord},
    usage::UsageLedger,
};

const LICENSE_TYPES: [(&str, LicenseMetric); 3] = [
    ("A90649", LicenseMetric::ProcessorPerpetual),
    ("A90611", LicenseMetric::NamedUserPlusPerpetual),
    ("A86813", LicenseMetric::ProcessorTerm),
];

fn license_table() -> LicenseTable {
    let mut table = LicenseTable::new();
    for (id, metric) in LICENSE_TYPES {
        table.insert(id.into(), LicenseType::new(id, "Benchmark option", metric));
    }
    table
}

/// `grant_count` grants, each associated with eight hosts out of
/// `host_count`, plus one usage record per host and license type.
fn estate(grant_count: usize, host_count: usize) -> (Vec<Agreement>, Vec<UsageRecord>) {
    let grants = (0..grant_count)
        .map(|index| {
            let (license_type_id, _) = LICENSE_TYPES[index % LICENSE_TYPES.len()];
            let hosts: Vec<String> = (0..8)
                .map(|offset| format!("host-{:04}", (index * 7 + offset) % host_count))
                .collect();
            let hosts: Vec<&str> = hosts.iter().map(String::as_str).collect();
            let mut grant = Agreement::new(&format!("AG-{index:05}"), license_type_id)
                .with_available_per_core((index % 40) as f64 + 4.0)
                .with_available_per_user(((index % 10) * 25) as f64)
                .with_hosts(&hosts);
            grant.capacity.basket = index % 5 == 0;
            grant.capacity.unlimited = index % 17 == 0;
            grant
        })
        .collect();

    let usage = (0..host_count)
        .flat_map(|host| {
            LICENSE_TYPES.iter().map(move |(license_type_id, _)| {
                UsageRecord::host(license_type_id, &format!("host-{host:04}"), (host % 13) as f64 + 1.0)
            })
        })
        .collect();

    (grants, usage)
}

// ---------------------------------------------------------------------------
// Allocation passes
// ---------------------------------------------------------------------------

fn allocation_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("allocate");
    let table = license_table();
    let memberships = MembershipTable::new();

    for &(grants, hosts) in &[(10usize, 50usize), (100, 500), (1_000, 2_000)] {
        let (grant_set, usage) = estate(grants, hosts);
        group.bench_with_input(
            BenchmarkId::new("grants_hosts", format!("{grants}x{hosts}")),
            &(grant_set, usage),
            |bencher, (grant_set, usage)| {
                bencher.iter(|| {
                    let mut grants = grant_set.clone();
                    let mut ledger = UsageLedger::from_records(usage.clone());
                    let stats = allocate(
                        black_box(&mut grants),
                        &mut ledger,
                        &table,
                        &memberships,
                        AllocationPolicy::default(),
                    );
                    black_box(stats);
                });
            },
        );
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Cluster sharing
// ---------------------------------------------------------------------------

fn cluster_sharing_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("cluster_sharing");
    let table = license_table();
    let (grant_set, mut usage) = estate(200, 400);

    // Forty four-node clusters for every license type.
    let mut memberships = MembershipTable::new();
    for cluster in 0..40 {
        let name = format!("rac-{cluster:02}");
        let hosts = (0..4).map(|node| format!("host-{:04}", cluster * 4 + node)).collect();
        memberships.insert(name.clone(), ClusterMembership { cluster: name.clone(), hosts });
        for (license_type_id, _) in LICENSE_TYPES {
            usage.push(UsageRecord::cluster(license_type_id, &name, 16.0));
        }
    }

    group.bench_function("200_grants_40_clusters", |bencher| {
        bencher.iter(|| {
            let mut grants = grant_set.clone();
            let mut ledger = UsageLedger::from_records(usage.clone());
            let stats = allocate(&mut grants, &mut ledger, &table, &memberships, AllocationPolicy::default());
            black_box(stats);
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Full engine run
// ---------------------------------------------------------------------------

fn engine_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("engine");

    let (grants, usage) = estate(250, 500);
    let mut inventory = InMemoryInventory::new();
    for (id, metric) in LICENSE_TYPES {
        inventory.add_license_type(LicenseType::new(id, "Benchmark option", metric));
    }
    for grant in grants {
        inventory.add_agreement(grant);
    }
    for record in usage {
        inventory.add_usage(record);
    }
    let engine = AllocationEngine::new(Config::default(), inventory);

    group.bench_function("agreements_250x500", |bencher| {
        bencher.iter(|| {
            let outcome = engine.agreements();
            black_box(outcome.map(|outcome| outcome.compliance.len()).unwrap_or_default());
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

fn filter_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("filter");

    let (mut grants, usage) = estate(1_000, 2_000);
    let mut ledger = UsageLedger::from_records(usage);
    allocate(
        &mut grants,
        &mut ledger,
        &license_table(),
        &MembershipTable::new(),
        AllocationPolicy::default(),
    );

    let filter = GrantFilter {
        reference: Some("ag-00".into()),
        basket: Some(false),
        covered_licenses_gte: 10.0,
        ..GrantFilter::default()
    };

    group.bench_function("matches_1000_grants", |bencher| {
        bencher.iter(|| {
            let matched = grants.iter().filter(|grant| filter.matches(*grant)).count();
            black_box(matched);
        });
    });

    group.bench_function("reference_lookup", |bencher| {
        bencher.iter(|| {
            let found = grants.iter().find(|grant| grant.reference() == black_box("AG-00999"));
            black_box(found.is_some());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    allocation_benchmark,
    cluster_sharing_benchmark,
    engine_benchmark,
    filter_benchmark,
);
criterion_main!(benches);
