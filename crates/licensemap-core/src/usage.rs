// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Usage ledger: the single depletion point for one allocation run.
//!
//! Every [`UsageRecord`] lives exactly once in the ledger's arena.  The host
//! index (license type → hostname → slot) and the cluster index (license
//! type → slots) only hold [`UsageId`]s into that arena, so a decrement made
//! while walking one grant's hosts is what the next grant, the basket pass,
//! and the tally all observe.

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::types::{sanitize_amount, ConsumerKind, UsageRecord};

/// Slot of a record in the ledger arena.
pub type UsageId = usize;

/// Arena of usage records with lookup indices.
///
/// # Examples
///
/// ```rust
/// use licensemap_core::types::UsageRecord;
/// use licensemap_core::usage::UsageLedger;
///
/// let ledger = UsageLedger::from_records(vec![
///     UsageRecord::host("A90611", "db-01", 4.0),
///     UsageRecord::host("A90611", "db-01", 2.0),
///     UsageRecord::cluster("A90611", "rac-01", 8.0),
/// ]);
///
/// // Duplicate host rows are merged into one record.
/// assert_eq!(ledger.len(), 2);
/// assert_eq!(ledger.host_remaining("A90611", "db-01"), 6.0);
/// assert_eq!(ledger.clusters_of("A90611").len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct UsageLedger {
    records: Vec<UsageRecord>,
    /// license type → hostname → slot.
    hosts: HashMap<String, HashMap<String, UsageId>>,
    /// license type → cluster slots, in insertion order.
    clusters: HashMap<String, Vec<UsageId>>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<T>(records: T) -> Self
    where
        T: IntoIterator<Item = UsageRecord>,
    {
        let mut ledger = Self::new();
        for record in records {
            ledger.insert(record);
        }
        ledger
    }

    /// Add a record, merging it into an existing one with the same kind,
    /// license type and consumer name.
    ///
    /// The ledger is rebuilt for every run, so incoming demand is taken as
    /// fresh: `original` is clamped into the non-negative finite range and
    /// `remaining` is reset to it, whatever the collector handed over.
    pub fn insert(&mut self, mut record: UsageRecord) -> UsageId {
        record.original = sanitize_amount(record.original);
        record.remaining = record.original;

        if let Some(id) = self.find(record.kind, &record.license_type_id, &record.name) {
            if let Some(existing) = self.records.get_mut(id) {
                existing.original += record.original;
                existing.remaining += record.remaining;
            }
            return id;
        }

        let id = self.records.len();
        match record.kind {
            ConsumerKind::Host => {
                self.hosts
                    .entry(record.license_type_id.clone())
                    .or_default()
                    .insert(record.name.clone(), id);
            }
            ConsumerKind::Cluster => {
                self.clusters
                    .entry(record.license_type_id.clone())
                    .or_default()
                    .push(id);
            }
        }
        self.records.push(record);
        id
    }

    fn find(&self, kind: ConsumerKind, license_type_id: &str, name: &str) -> Option<UsageId> {
        match kind {
            ConsumerKind::Host => self.host(license_type_id, name),
            ConsumerKind::Cluster => self
                .clusters_of(license_type_id)
                .iter()
                .copied()
                .find(|&id| self.records.get(id).map_or(false, |r| r.name == name)),
        }
    }

    /// Slot of `hostname`'s usage of `license_type_id`.
    pub fn host(&self, license_type_id: &str, hostname: &str) -> Option<UsageId> {
        self.hosts
            .get(license_type_id)
            .and_then(|by_name| by_name.get(hostname))
            .copied()
    }

    /// Uncovered demand of a host, `0` when the host has no usage.
    pub fn host_remaining(&self, license_type_id: &str, hostname: &str) -> f64 {
        self.host(license_type_id, hostname)
            .and_then(|id| self.get(id))
            .map_or(0.0, |record| record.remaining)
    }

    /// Cluster slots consuming `license_type_id`.
    pub fn clusters_of(&self, license_type_id: &str) -> &[UsageId] {
        self.clusters
            .get(license_type_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct cluster names across every license type, sorted.
    pub fn cluster_names(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .records
            .iter()
            .filter(|record| record.kind == ConsumerKind::Cluster)
            .map(|record| record.name.as_str())
            .collect();
        names.into_iter().collect()
    }

    pub fn get(&self, id: UsageId) -> Option<&UsageRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: UsageId) -> Option<&mut UsageRecord> {
        self.records.get_mut(id)
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<UsageRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_host_and_cluster_with_same_name_stay_separate() {
        let ledger = UsageLedger::from_records(vec![
            UsageRecord::host("L1", "node", 2.0),
            UsageRecord::cluster("L1", "node", 6.0),
        ]);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.host_remaining("L1", "node"), 2.0);
        let cluster = ledger.clusters_of("L1")[0];
        assert_eq!(ledger.get(cluster).map(|r| r.original), Some(6.0));
    }

    #[test]
    fn test_decrement_is_visible_through_index() {
        let mut ledger = UsageLedger::from_records(vec![UsageRecord::host("L1", "db-01", 5.0)]);
        let id = ledger.host("L1", "db-01").expect("indexed");
        if let Some(record) = ledger.get_mut(id) {
            record.consume(3.0);
        }
        assert_eq!(ledger.host_remaining("L1", "db-01"), 2.0);
        assert_eq!(ledger.records()[0].remaining, 2.0);
    }

    #[test]
    fn test_duplicate_clusters_merge() {
        let ledger = UsageLedger::from_records(vec![
            UsageRecord::cluster("L1", "rac", 2.0),
            UsageRecord::cluster("L1", "rac", 3.0),
            UsageRecord::cluster("L2", "rac", 1.0),
        ]);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.cluster_names(), vec!["rac"]);
    }

    #[test]
    fn test_incoming_records_are_normalised() {
        let skewed = vec![
            UsageRecord { remaining: 7.0, ..UsageRecord::host("L1", "db-01", 3.0) },
            UsageRecord { original: -4.0, remaining: -4.0, ..UsageRecord::host("L1", "db-02", 0.0) },
            UsageRecord { original: f64::NAN, remaining: 1.0, ..UsageRecord::cluster("L1", "rac", 0.0) },
            UsageRecord { remaining: 0.0, ..UsageRecord::host("L1", "db-03", 5.0) },
        ];
        let ledger = UsageLedger::from_records(skewed);

        let figures: Vec<(f64, f64)> = ledger.records().iter().map(|r| (r.original, r.remaining)).collect();
        assert_eq!(figures, vec![(3.0, 3.0), (0.0, 0.0), (0.0, 0.0), (5.0, 5.0)]);
    }

    #[test]
    fn test_missing_lookups() {
        let ledger = UsageLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.host("L1", "nobody"), None);
        assert_eq!(ledger.host_remaining("L1", "nobody"), 0.0);
        assert!(ledger.clusters_of("L1").is_empty());
    }
}
