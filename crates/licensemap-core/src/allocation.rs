// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! The allocation passes.
//!
//! [`allocate`] runs, in order and on a single thread:
//!
//! 1. **Sort**: grants are sorted once by
//!    [`grant_priority`](crate::ordering::grant_priority) and never re-sorted.
//! 2. **Direct pass**: each grant covers its associated hosts, largest
//!    remaining demand first.  Before each host, unrestricted grants take a
//!    one-time charge for every cluster of the same license type the host
//!    belongs to.
//! 3. **Basket pass**: leftover demand, largest first, is offered to basket
//!    grants of the matching license type regardless of association.  This
//!    includes cluster records, whose demand cluster sharing never depletes.
//! 4. **Tally**: every associated host reports the aggregate coverage of its
//!    usage record across all grants.
//!
//! Usage records are shared by every grant through the [`UsageLedger`], so
//! the order above decides who covers what.  There is no parallelism inside
//! a run.

use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use hashbrown::{HashMap, HashSet};
use tracing::debug;

use crate::grant::{is_named_user_plus, Capacity, ClusterCharge, Grant};
use crate::ordering::{sort_grants, sort_hosts_by_remaining, usage_priority};
use crate::types::{sanitize_amount, ClusterMembership, LicenseMetric, LicenseType, NAMED_USER_FACTOR};
use crate::usage::{UsageId, UsageLedger};

/// License type table keyed by license type ID.
pub type LicenseTable = HashMap<String, LicenseType>;

/// Cluster memberships keyed by cluster name.
pub type MembershipTable = HashMap<String, ClusterMembership>;

/// Knobs that differ between grant kinds or deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationPolicy {
    pub cluster_charge: ClusterCharge,
    /// Factor used when a license type carries none.
    pub named_user_factor: u32,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            cluster_charge: ClusterCharge::DecrementAvailability,
            named_user_factor: NAMED_USER_FACTOR,
        }
    }
}

/// Totals of one run, for logging and reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunStats {
    /// Units covered on explicitly associated hosts.
    pub direct_covered: f64,
    /// Units charged through cluster sharing.
    pub cluster_charged: f64,
    /// Units covered by basket spillover.
    pub basket_covered: f64,
    /// Distinct (license type, cluster) pairs charged.
    pub clusters_consumed: usize,
    /// Grants skipped because they had nothing left to give.
    pub grants_exhausted: usize,
}

/// Metric and rounding factor a grant is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terms {
    pub metric: Option<LicenseMetric>,
    pub factor: u32,
}

impl Terms {
    pub fn is_named_user_plus(self) -> bool {
        is_named_user_plus(self.metric)
    }
}

/// Whether a grant can still cover anything.
///
/// Unlimited grants always can, whatever their availability fields show.
///
/// # Examples
///
/// ```rust
/// use licensemap_core::allocation::has_available_licenses;
/// use licensemap_core::grant::Capacity;
/// use licensemap_core::types::LicenseMetric;
///
/// let per_core = Capacity { available_per_core: 2.0, ..Capacity::default() };
/// assert!(has_available_licenses(&per_core, Some(LicenseMetric::ProcessorPerpetual)));
/// assert!(!has_available_licenses(&per_core, Some(LicenseMetric::NamedUserPlusPerpetual)));
///
/// let open = Capacity { unlimited: true, ..Capacity::default() };
/// assert!(has_available_licenses(&open, None));
/// ```
pub fn has_available_licenses(capacity: &Capacity, metric: Option<LicenseMetric>) -> bool {
    if capacity.unlimited {
        return true;
    }
    if is_named_user_plus(metric) {
        capacity.available_per_user > 0.0
    } else {
        capacity.available_per_core > 0.0
    }
}

/// Take up to `demand` units out of `capacity` and return how many were taken.
///
/// * Unlimited: all of `demand`; the metric's availability field is zeroed
///   for display only.
/// * Named-user-plus: availability is floored to a multiple of the factor
///   before it is compared with `demand`.
/// * Otherwise: plain minimum of availability and demand.
///
/// # Examples
///
/// ```rust
/// use licensemap_core::allocation::{take_coverable, Terms};
/// use licensemap_core::grant::Capacity;
/// use licensemap_core::types::LicenseMetric;
///
/// let nup = Terms { metric: Some(LicenseMetric::NamedUserPlusPerpetual), factor: 25 };
/// let mut capacity = Capacity { available_per_user: 60.0, ..Capacity::default() };
///
/// // The pool is floored to 50 before the minimum is taken.
/// assert_eq!(take_coverable(&mut capacity, nup, 80.0), 50.0);
/// assert_eq!(capacity.available_per_user, 10.0);
/// ```
pub fn take_coverable(capacity: &mut Capacity, terms: Terms, demand: f64) -> f64 {
    if demand <= 0.0 {
        return 0.0;
    }
    if capacity.unlimited {
        *capacity.available_mut(terms.metric) = 0.0;
        return demand;
    }

    let available = capacity.available_mut(terms.metric);
    let pool = if terms.is_named_user_plus() {
        floor_to_factor(*available, terms.factor)
    } else {
        *available
    };
    let coverable = pool.min(demand).max(0.0);
    *available = (*available - coverable).max(0.0);
    coverable
}

/// Round `amount` down to a multiple of `factor`.
fn floor_to_factor(amount: f64, factor: u32) -> f64 {
    if amount <= 0.0 {
        return 0.0;
    }
    let factor = f64::from(factor.max(1));
    // Truncation equals floor for non-negative values.
    ((amount / factor) as u64) as f64 * factor
}

/// Run every allocation pass over `grants` against `ledger`.
///
/// Coverage figures on the grants are reset first, so running the function
/// on a fresh clone of the same inputs always yields the same result.  The
/// grant slice is left in priority order.
///
/// # Examples
///
/// ```rust
/// use licensemap_core::allocation::{allocate, AllocationPolicy, LicenseTable, MembershipTable};
/// use licensemap_core::grant::{Agreement, Grant};
/// use licensemap_core::types::{LicenseMetric, LicenseType, UsageRecord};
/// use licensemap_core::usage::UsageLedger;
///
/// let mut table = LicenseTable::new();
/// table.insert("L1".into(), LicenseType::new("L1", "Partitioning", LicenseMetric::ProcessorPerpetual));
///
/// let mut grants = vec![Agreement::new("AG-1", "L1").with_available_per_core(5.0).with_hosts(&["db-01"])];
/// let mut ledger = UsageLedger::from_records(vec![UsageRecord::host("L1", "db-01", 3.0)]);
///
/// allocate(&mut grants, &mut ledger, &table, &MembershipTable::new(), AllocationPolicy::default());
///
/// assert_eq!(grants[0].capacity.hosts[0].covered_licenses_count, 3.0);
/// assert_eq!(grants[0].capacity.available_per_core, 2.0);
/// ```
pub fn allocate<G: Grant>(
    grants: &mut [G],
    ledger: &mut UsageLedger,
    license_types: &LicenseTable,
    memberships: &MembershipTable,
    policy: AllocationPolicy,
) -> RunStats {
    for grant in grants.iter_mut() {
        let capacity = grant.capacity_mut();
        capacity.reset_coverage();
        capacity.available_per_core = sanitize_amount(capacity.available_per_core);
        capacity.available_per_user = sanitize_amount(capacity.available_per_user);
    }

    sort_grants(grants);

    let mut run = Run {
        ledger,
        license_types,
        memberships,
        policy,
        consumed_clusters: HashSet::new(),
        stats: RunStats::default(),
    };

    for grant in grants.iter_mut() {
        run.direct_pass(grant);
    }
    run.basket_pass(grants);
    run.tally(grants);

    run.stats.clusters_consumed = run.consumed_clusters.len();
    run.stats
}

/// State of one run: the ledger being depleted plus the clusters already
/// charged.
struct Run<'a> {
    ledger: &'a mut UsageLedger,
    license_types: &'a LicenseTable,
    memberships: &'a MembershipTable,
    policy: AllocationPolicy,
    consumed_clusters: HashSet<UsageId>,
    stats: RunStats,
}

impl Run<'_> {
    fn terms(&self, license_type_id: &str) -> Terms {
        match self.license_types.get(license_type_id) {
            Some(license_type) => Terms {
                metric: Some(license_type.metric),
                factor: if license_type.factor > 0 {
                    license_type.factor
                } else {
                    self.policy.named_user_factor
                },
            },
            None => Terms {
                metric: None,
                factor: self.policy.named_user_factor,
            },
        }
    }

    fn direct_pass<G: Grant>(&mut self, grant: &mut G) {
        let license_type_id: String = grant.license_type_id().into();
        let terms = self.terms(&license_type_id);
        let grant_id: String = grant.id().into();
        let capacity = grant.capacity_mut();

        if !has_available_licenses(capacity, terms.metric) {
            self.stats.grants_exhausted += 1;
            return;
        }

        sort_hosts_by_remaining(&mut capacity.hosts, self.ledger, &license_type_id);

        for index in 0..capacity.hosts.len() {
            if !has_available_licenses(capacity, terms.metric) {
                break;
            }
            let hostname = capacity.hosts[index].hostname.clone();

            if !capacity.restricted {
                self.share_clusters(capacity, &license_type_id, &hostname, terms);
            }

            let Some(id) = self.ledger.host(&license_type_id, &hostname) else {
                continue;
            };
            let demand = self.ledger.get(id).map_or(0.0, |record| record.remaining);
            if demand <= 0.0 {
                continue;
            }

            let coverable = take_coverable(capacity, terms, demand);
            capacity.hosts[index].covered_licenses_count += coverable;
            capacity.covered_licenses += coverable;
            if let Some(record) = self.ledger.get_mut(id) {
                record.consume(coverable);
            }
            self.stats.direct_covered += coverable;

            debug!(
                kind = G::KIND.label(),
                grant = %grant_id,
                host = %hostname,
                license_type = %license_type_id,
                coverable,
                "covered associated host"
            );
        }
    }

    /// Charge `capacity` once for every cluster running `hostname` that has
    /// not been charged yet in this run.  Cluster demand itself is left
    /// untouched.
    fn share_clusters(
        &mut self,
        capacity: &mut Capacity,
        license_type_id: &str,
        hostname: &str,
        terms: Terms,
    ) {
        for &id in self.ledger.clusters_of(license_type_id) {
            if self.consumed_clusters.contains(&id) {
                continue;
            }
            let Some(record) = self.ledger.get(id) else {
                continue;
            };
            let member = self
                .memberships
                .get(record.name.as_str())
                .map_or(false, |membership| membership.contains(hostname));
            if !member {
                continue;
            }

            let amount = record.remaining;
            capacity.covered_licenses += amount;
            if self.policy.cluster_charge.decrements_availability() {
                let available = capacity.available_mut(terms.metric);
                *available = (*available - amount).max(0.0);
            }
            self.consumed_clusters.insert(id);
            self.stats.cluster_charged += amount;

            debug!(
                cluster = %record.name,
                host = %hostname,
                license_type = %license_type_id,
                amount,
                "charged cluster usage"
            );
        }
    }

    fn basket_pass<G: Grant>(&mut self, grants: &mut [G]) {
        let ledger = &*self.ledger;
        let mut order: Vec<UsageId> = (0..ledger.len()).collect();
        order.sort_by(|&a, &b| match (ledger.get(a), ledger.get(b)) {
            (Some(a), Some(b)) => usage_priority(a, b),
            _ => Ordering::Equal,
        });

        for id in order {
            let Some(record) = self.ledger.get(id) else {
                continue;
            };
            if record.remaining <= 0.0 {
                continue;
            }
            let license_type_id = record.license_type_id.clone();
            let consumer = record.name.clone();

            for grant in grants.iter_mut() {
                let demand = self.ledger.get(id).map_or(0.0, |record| record.remaining);
                if demand <= 0.0 {
                    break;
                }
                if !grant.capacity().basket || grant.license_type_id() != license_type_id {
                    continue;
                }
                let terms = self.terms(&license_type_id);
                if !has_available_licenses(grant.capacity(), terms.metric) {
                    continue;
                }

                let capacity = grant.capacity_mut();
                let coverable = take_coverable(capacity, terms, demand);
                capacity.covered_licenses += coverable;
                if let Some(record) = self.ledger.get_mut(id) {
                    record.consume(coverable);
                }
                self.stats.basket_covered += coverable;

                debug!(
                    kind = G::KIND.label(),
                    grant = %grant.id(),
                    consumer = %consumer,
                    license_type = %license_type_id,
                    coverable,
                    "basket spillover"
                );
            }
        }
    }

    fn tally<G: Grant>(&self, grants: &mut [G]) {
        for grant in grants.iter_mut() {
            let license_type_id: String = grant.license_type_id().into();
            for host in &mut grant.capacity_mut().hosts {
                let record = self
                    .ledger
                    .host(&license_type_id, &host.hostname)
                    .and_then(|id| self.ledger.get(id));
                match record {
                    Some(record) => {
                        host.total_covered_licenses_count = record.covered();
                        host.consumed_licenses_count = record.original;
                    }
                    None => {
                        host.total_covered_licenses_count = 0.0;
                        host.consumed_licenses_count = 0.0;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::{Agreement, Contract};
    use crate::types::UsageRecord;
    use alloc::vec;

    fn table() -> LicenseTable {
        let mut table = LicenseTable::new();
        table.insert("CPU".into(), LicenseType::new("CPU", "Diagnostics Pack", LicenseMetric::ProcessorPerpetual));
        table.insert("NUP".into(), LicenseType::new("NUP", "Database EE", LicenseMetric::NamedUserPlusPerpetual));
        table
    }

    fn membership(cluster: &str, hosts: &[&str]) -> MembershipTable {
        let mut table = MembershipTable::new();
        table.insert(
            cluster.into(),
            ClusterMembership {
                cluster: cluster.into(),
                hosts: hosts.iter().map(|h| String::from(*h)).collect(),
            },
        );
        table
    }

    #[test]
    fn test_floor_to_factor() {
        assert_eq!(floor_to_factor(249.0, 25), 225.0);
        assert_eq!(floor_to_factor(250.0, 25), 250.0);
        assert_eq!(floor_to_factor(10.0, 25), 0.0);
        assert_eq!(floor_to_factor(7.5, 0), 7.0);
        assert_eq!(floor_to_factor(-3.0, 25), 0.0);
    }

    #[test]
    fn test_unlimited_zeroes_display_field_only() {
        let terms = Terms { metric: Some(LicenseMetric::ProcessorPerpetual), factor: 1 };
        let mut capacity = Capacity { unlimited: true, available_per_core: 4.0, ..Capacity::default() };
        assert_eq!(take_coverable(&mut capacity, terms, 9.0), 9.0);
        assert_eq!(capacity.available_per_core, 0.0);
        assert!(has_available_licenses(&capacity, terms.metric));
        assert_eq!(take_coverable(&mut capacity, terms, 2.0), 2.0);
    }

    #[test]
    fn test_nup_pool_below_factor_covers_nothing() {
        let terms = Terms { metric: Some(LicenseMetric::NamedUserPlusPerpetual), factor: 25 };
        let mut capacity = Capacity { available_per_user: 20.0, ..Capacity::default() };
        assert!(has_available_licenses(&capacity, terms.metric));
        assert_eq!(take_coverable(&mut capacity, terms, 5.0), 0.0);
        assert_eq!(capacity.available_per_user, 20.0);
    }

    #[test]
    fn test_cluster_charged_once_per_run() {
        let mut grants = vec![
            Agreement::new("AG-1", "CPU").with_available_per_core(100.0).with_hosts(&["node-a", "node-b"]),
            Agreement::new("AG-2", "CPU").with_available_per_core(50.0).with_hosts(&["node-a"]),
        ];
        let mut ledger = UsageLedger::from_records(vec![UsageRecord::cluster("CPU", "rac", 16.0)]);
        let stats = allocate(
            &mut grants,
            &mut ledger,
            &table(),
            &membership("rac", &["node-a", "node-b"]),
            AllocationPolicy::default(),
        );

        assert_eq!(grants[0].capacity.covered_licenses, 16.0);
        assert_eq!(grants[0].capacity.available_per_core, 84.0);
        assert_eq!(grants[1].capacity.covered_licenses, 0.0);
        assert_eq!(grants[1].capacity.available_per_core, 50.0);
        assert_eq!(stats.clusters_consumed, 1);
        // Cluster demand is a grant-side charge, not consumer-side depletion.
        assert_eq!(ledger.records()[0].remaining, 16.0);
    }

    #[test]
    fn test_record_only_charge_keeps_availability() {
        let mut grants = vec![Contract::new("C-1", "CPU").with_available_per_core(10.0).with_hosts(&["node-a"])];
        let mut ledger = UsageLedger::from_records(vec![
            UsageRecord::cluster("CPU", "rac", 4.0),
            UsageRecord::host("CPU", "node-a", 2.0),
        ]);
        let policy = AllocationPolicy { cluster_charge: ClusterCharge::RecordOnly, ..AllocationPolicy::default() };
        allocate(&mut grants, &mut ledger, &table(), &membership("rac", &["node-a"]), policy);

        assert_eq!(grants[0].capacity.covered_licenses, 6.0);
        assert_eq!(grants[0].capacity.available_per_core, 8.0);
    }

    #[test]
    fn test_restricted_grant_skips_cluster_sharing() {
        let mut grants = vec![Agreement::new("AG-1", "CPU")
            .with_available_per_core(10.0)
            .with_hosts(&["node-a"])
            .restricted()];
        let mut ledger = UsageLedger::from_records(vec![UsageRecord::cluster("CPU", "rac", 4.0)]);
        let stats = allocate(
            &mut grants,
            &mut ledger,
            &table(),
            &membership("rac", &["node-a"]),
            AllocationPolicy::default(),
        );
        assert_eq!(grants[0].capacity.covered_licenses, 0.0);
        assert_eq!(stats.clusters_consumed, 0);
    }

    #[test]
    fn test_basket_covers_cluster_charged_by_sharing() {
        let mut grants = vec![
            Agreement::new("AG-BASKET", "CPU").with_available_per_core(50.0).basket(),
            Agreement::new("AG-DIRECT", "CPU").with_available_per_core(100.0).with_hosts(&["node-a"]),
        ];
        let mut ledger = UsageLedger::from_records(vec![UsageRecord::cluster("CPU", "rac", 8.0)]);
        let stats = allocate(
            &mut grants,
            &mut ledger,
            &table(),
            &membership("rac", &["node-a"]),
            AllocationPolicy::default(),
        );

        assert_eq!(grants[0].agreement_id, "AG-DIRECT");
        assert_eq!(grants[0].capacity.covered_licenses, 8.0);
        assert_eq!(grants[0].capacity.available_per_core, 92.0);
        assert_eq!(grants[1].capacity.covered_licenses, 8.0);
        assert_eq!(grants[1].capacity.available_per_core, 42.0);
        assert_eq!(ledger.records()[0].remaining, 0.0);
        assert_eq!(stats.clusters_consumed, 1);
        assert_eq!(stats.basket_covered, 8.0);
    }

    /// A cluster charge records the whole cluster demand even when the grant
    /// holds less; only availability is clamped.
    #[test]
    fn test_cluster_charge_may_exceed_holdings() {
        let mut grants = vec![Agreement::new("AG-1", "CPU").with_available_per_core(3.0).with_hosts(&["node-a"])];
        let mut ledger = UsageLedger::from_records(vec![UsageRecord::cluster("CPU", "rac", 8.0)]);
        allocate(
            &mut grants,
            &mut ledger,
            &table(),
            &membership("rac", &["node-a"]),
            AllocationPolicy::default(),
        );
        assert_eq!(grants[0].capacity.available_per_core, 0.0);
        assert_eq!(grants[0].capacity.covered_licenses, 8.0);
    }

    #[test]
    fn test_exhausted_grant_is_skipped() {
        let mut grants = vec![Agreement::new("AG-empty", "CPU").with_hosts(&["db-01"])];
        let mut ledger = UsageLedger::from_records(vec![UsageRecord::host("CPU", "db-01", 2.0)]);
        let stats = allocate(&mut grants, &mut ledger, &table(), &MembershipTable::new(), AllocationPolicy::default());
        assert_eq!(stats.grants_exhausted, 1);
        assert_eq!(grants[0].capacity.hosts[0].covered_licenses_count, 0.0);
        assert_eq!(grants[0].capacity.hosts[0].consumed_licenses_count, 2.0);
    }

    #[test]
    fn test_previous_coverage_is_reset() {
        let mut grant = Agreement::new("AG-1", "CPU").with_available_per_core(5.0).with_hosts(&["db-01"]);
        grant.capacity.covered_licenses = 99.0;
        grant.capacity.hosts[0].covered_licenses_count = 42.0;
        let mut grants = vec![grant];
        let mut ledger = UsageLedger::from_records(vec![UsageRecord::host("CPU", "db-01", 1.0)]);
        allocate(&mut grants, &mut ledger, &table(), &MembershipTable::new(), AllocationPolicy::default());
        assert_eq!(grants[0].capacity.covered_licenses, 1.0);
        assert_eq!(grants[0].capacity.hosts[0].covered_licenses_count, 1.0);
    }

    #[test]
    fn test_unknown_license_type_counts_per_core() {
        let mut grants = vec![Agreement::new("AG-1", "MISSING").with_available_per_core(2.0).with_hosts(&["db-01"])];
        let mut ledger = UsageLedger::from_records(vec![UsageRecord::host("MISSING", "db-01", 3.0)]);
        allocate(&mut grants, &mut ledger, &table(), &MembershipTable::new(), AllocationPolicy::default());
        assert_eq!(grants[0].capacity.covered_licenses, 2.0);
        assert_eq!(ledger.host_remaining("MISSING", "db-01"), 1.0);
    }
}
