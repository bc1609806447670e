// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Engine-level configuration.
//!
//! [`Config`] is the single entry point for tuning the allocation engine at
//! construction time.  All fields have defaults matching a standard
//! deployment so that `Config::default()` is always a valid starting point.

use serde::{Deserialize, Serialize};

use crate::allocation::AllocationPolicy;
use crate::grant::{ClusterCharge, GrantKind};
use crate::types::NAMED_USER_FACTOR;

/// Top-level configuration for [`AllocationEngine`](crate::engine::AllocationEngine).
///
/// # Examples
///
/// ```rust
/// use licensemap_core::config::Config;
/// use licensemap_core::grant::ClusterCharge;
///
/// let config = Config {
///     contract_cluster_charge: ClusterCharge::DecrementAvailability,
///     ..Config::default()
/// };
/// assert_eq!(config.named_user_factor, 25);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Rounding factor for named-user-plus license types that do not carry
    /// one of their own.  Defaults to `25`.
    pub named_user_factor: u32,

    /// Whether cluster-sharing charges on agreements reduce availability.
    /// Defaults to [`ClusterCharge::DecrementAvailability`].
    pub agreement_cluster_charge: ClusterCharge,

    /// Whether cluster-sharing charges on contracts reduce availability.
    /// Defaults to [`ClusterCharge::RecordOnly`].
    pub contract_cluster_charge: ClusterCharge,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            named_user_factor: NAMED_USER_FACTOR,
            agreement_cluster_charge: ClusterCharge::DecrementAvailability,
            contract_cluster_charge: ClusterCharge::RecordOnly,
        }
    }
}

impl Config {
    /// The allocation policy for one grant kind.
    pub fn policy_for(&self, kind: GrantKind) -> AllocationPolicy {
        let cluster_charge = match kind {
            GrantKind::Agreement => self.agreement_cluster_charge,
            GrantKind::Contract  => self.contract_cluster_charge,
        };
        AllocationPolicy {
            cluster_charge,
            named_user_factor: self.named_user_factor.max(1),
        }
    }
}
