// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Ordering policy.
//!
//! * Grants: the most constrained capacity is spent first, so non-basket
//!   before basket, limited before unlimited, then larger user and core
//!   availability first.
//! * Usage: the largest remaining demand is offered capacity first, with
//!   consumer name and license type (both descending) as tie-breaks.
//! * Hosts within one grant: largest remaining demand first.
//!
//! All sorts are stable, so equal keys keep their input order.

use core::cmp::Ordering;

use crate::grant::Grant;
use crate::types::{AssociatedHost, UsageRecord};
use crate::usage::UsageLedger;

/// Grant priority: `Less` means `a` is allocated before `b`.
pub fn grant_priority<G: Grant>(a: &G, b: &G) -> Ordering {
    let (a, b) = (a.capacity(), b.capacity());
    a.basket
        .cmp(&b.basket)
        .then(a.unlimited.cmp(&b.unlimited))
        .then(b.available_per_user.total_cmp(&a.available_per_user))
        .then(b.available_per_core.total_cmp(&a.available_per_core))
}

/// Usage priority: `Less` means `a` is offered capacity before `b`.
pub fn usage_priority(a: &UsageRecord, b: &UsageRecord) -> Ordering {
    b.remaining
        .total_cmp(&a.remaining)
        .then_with(|| b.name.cmp(&a.name))
        .then_with(|| b.license_type_id.cmp(&a.license_type_id))
}

/// Sort grants once, before any allocation.
pub fn sort_grants<G: Grant>(grants: &mut [G]) {
    grants.sort_by(grant_priority);
}

/// Sort one grant's hosts by their current remaining demand, largest first.
pub fn sort_hosts_by_remaining(
    hosts: &mut [AssociatedHost],
    ledger: &UsageLedger,
    license_type_id: &str,
) {
    hosts.sort_by(|a, b| {
        let a = ledger.host_remaining(license_type_id, &a.hostname);
        let b = ledger.host_remaining(license_type_id, &b.hostname);
        b.total_cmp(&a)
    });
}
