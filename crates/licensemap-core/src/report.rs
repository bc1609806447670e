// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Per-license-type compliance summary of one allocation run.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::allocation::LicenseTable;
use crate::grant::Grant;
use crate::types::{sanitize_amount, ConsumerKind};
use crate::usage::UsageLedger;

/// Demand against supply for one license type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseCompliance {
    pub license_type_id: String,
    /// Σ measured host demand.
    pub consumed: f64,
    /// Σ host demand covered by any grant.
    pub covered: f64,
    /// Σ initial availability of limited grants, in the metric's unit.
    pub purchased: f64,
    /// At least one unlimited grant exists for the type.
    pub unlimited: bool,
    pub compliant: bool,
}

impl LicenseCompliance {
    fn new(license_type_id: &str) -> Self {
        Self {
            license_type_id: license_type_id.into(),
            consumed: 0.0,
            covered: 0.0,
            purchased: 0.0,
            unlimited: false,
            compliant: true,
        }
    }

    /// Host demand left uncovered.
    pub fn uncovered(&self) -> f64 {
        (self.consumed - self.covered).max(0.0)
    }
}

/// Supply per license type, captured before allocation spends it.
///
/// Figures are sanitised the same way [`allocate`](crate::allocation::allocate)
/// sanitises availability, and accumulated grant by grant, so grants
/// sharing an ID are each counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Supply {
    rows: BTreeMap<String, LicenseCompliance>,
}

impl Supply {
    pub fn capture<G: Grant>(grants: &[G], license_types: &LicenseTable) -> Self {
        let mut rows: BTreeMap<String, LicenseCompliance> = BTreeMap::new();
        for grant in grants {
            let license_type_id = grant.license_type_id();
            let row = rows
                .entry(license_type_id.into())
                .or_insert_with(|| LicenseCompliance::new(license_type_id));
            let capacity = grant.capacity();
            if capacity.unlimited {
                row.unlimited = true;
                continue;
            }
            let metric = license_types.get(license_type_id).map(|t| t.metric);
            row.purchased += sanitize_amount(capacity.available(metric));
        }
        Self { rows }
    }
}

/// Summarise a finished run against the supply captured before it.
///
/// Rows come back sorted by license type ID.
pub fn summarize(supply: Supply, ledger: &UsageLedger) -> Vec<LicenseCompliance> {
    let mut rows = supply.rows;

    for record in ledger.records() {
        if record.kind != ConsumerKind::Host {
            continue;
        }
        let row = rows
            .entry(record.license_type_id.clone())
            .or_insert_with(|| LicenseCompliance::new(&record.license_type_id));
        row.consumed += record.original;
        row.covered += record.covered();
    }

    rows.into_values()
        .map(|mut row| {
            row.compliant = row.unlimited || row.covered >= row.consumed;
            row
        })
        .collect()
}
