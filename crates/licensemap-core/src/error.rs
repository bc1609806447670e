// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Error taxonomy for allocation runs.
//!
//! The engine itself is a pure computation and cannot fail on its own.  Every
//! fatal error is a failure of an [`Inventory`](crate::inventory::Inventory)
//! call, surfaced unchanged so that the caller can decide whether to retry
//! the whole request.  The only non-fatal kind,
//! [`AllocationError::LicenseTypeNotFound`], is logged and collected in
//! [`AllocationOutcome::warnings`](crate::engine::AllocationOutcome::warnings).

use alloc::string::String;

/// A failure reported by the inventory collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InventoryError {
    pub message: String,
}

impl InventoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Errors raised while loading the inputs of an allocation run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationError {
    /// A grant references a license type missing from the table.  Non-fatal:
    /// description fields stay empty and the grant is allocated with an
    /// unknown metric.
    #[error("grant {grant_id} references unknown license type {license_type_id}")]
    LicenseTypeNotFound { grant_id: String, license_type_id: String },

    /// Cluster membership could not be resolved; the run is aborted because
    /// cluster sharing cannot be guessed.
    #[error("cluster lookup failed for {cluster}: {source}")]
    ClusterLookupFailed {
        cluster: String,
        #[source]
        source: InventoryError,
    },

    #[error("usage collection failed: {0}")]
    UsageCollectionFailed(#[source] InventoryError),

    #[error("grant listing failed: {0}")]
    GrantListingFailed(#[source] InventoryError),
}

impl AllocationError {
    /// Whether the error aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AllocationError::LicenseTypeNotFound { .. })
    }
}
