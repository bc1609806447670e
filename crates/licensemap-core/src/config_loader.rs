// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Configuration loader for [`AllocationEngine`](crate::engine::AllocationEngine).
//!
//! Supports two load strategies:
//!
//! 1. **TOML file**: [`load_config`] reads and deserialises a TOML file into
//!    an [`EngineConfig`] struct.
//! 2. **Environment variables**: [`load_config_from_env`] reads
//!    `LICENSEMAP_`-prefixed environment variables.
//!
//! Both loaders are only available when the `config-loader` feature is
//! active.
//!
//! # File format
//!
//! ```toml
//! named_user_factor        = 25
//! agreement_cluster_charge = "decrement-availability"   # or "record-only"
//! contract_cluster_charge  = "record-only"
//! ```
//!
//! # Environment variables
//!
//! | Variable                              | Type    | Default                    |
//! |---------------------------------------|---------|----------------------------|
//! | `LICENSEMAP_NAMED_USER_FACTOR`        | u32 ≥ 1 | 25                         |
//! | `LICENSEMAP_AGREEMENT_CLUSTER_CHARGE` | string  | "decrement-availability"   |
//! | `LICENSEMAP_CONTRACT_CLUSTER_CHARGE`  | string  | "record-only"              |

// "config-loader" implies "std", so std facilities are always available here.
#![cfg(feature = "config-loader")]

use std::fs;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::grant::ClusterCharge;
use crate::types::NAMED_USER_FACTOR;

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Flat, serialisation-friendly configuration as read from disk or the
/// environment.  Convert with [`Into<Config>`] after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_named_user_factor")]
    pub named_user_factor: u32,

    #[serde(default = "default_agreement_cluster_charge")]
    pub agreement_cluster_charge: ClusterCharge,

    #[serde(default = "default_contract_cluster_charge")]
    pub contract_cluster_charge: ClusterCharge,
}

fn default_named_user_factor() -> u32 { NAMED_USER_FACTOR }
fn default_agreement_cluster_charge() -> ClusterCharge { ClusterCharge::DecrementAvailability }
fn default_contract_cluster_charge() -> ClusterCharge { ClusterCharge::RecordOnly }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            named_user_factor:        default_named_user_factor(),
            agreement_cluster_charge: default_agreement_cluster_charge(),
            contract_cluster_charge:  default_contract_cluster_charge(),
        }
    }
}

impl From<EngineConfig> for Config {
    fn from(loaded: EngineConfig) -> Self {
        Config {
            named_user_factor: loaded.named_user_factor,
            agreement_cluster_charge: loaded.agreement_cluster_charge,
            contract_cluster_charge: loaded.contract_cluster_charge,
        }
    }
}

impl EngineConfig {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.named_user_factor == 0 {
            return Err(ConfigError::InvalidRange {
                field: "named_user_factor".into(),
                value: "0".into(),
                reason: "must be >= 1".into(),
            });
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors that can occur while loading or parsing engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file \"{path}\": {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {source}")]
    TomlParse {
        #[source]
        source: toml::de::Error,
    },

    #[error("field \"{field}\": cannot parse \"{value}\": {reason}")]
    ParseField { field: String, value: String, reason: String },

    #[error("field \"{field}\": value \"{value}\" out of range: {reason}")]
    InvalidRange { field: String, value: String, reason: String },
}

// ---------------------------------------------------------------------------
// TOML loader
// ---------------------------------------------------------------------------

/// Load an [`EngineConfig`] from a TOML file.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, if the TOML content
/// does not match the expected schema, or if a value is out of range.
///
/// # Example
///
/// ```rust,no_run
/// use licensemap_core::config_loader::load_config;
///
/// let config = load_config("/etc/licensemap/engine.toml").unwrap();
/// println!("Named-user factor: {}", config.named_user_factor);
/// ```
pub fn load_config(path: &str) -> Result<EngineConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_owned(),
        source,
    })?;
    parse_config(&content)
}

/// Parse an [`EngineConfig`] from TOML text.
pub fn parse_config(content: &str) -> Result<EngineConfig, ConfigError> {
    toml::from_str::<EngineConfig>(content)
        .map_err(|source| ConfigError::TomlParse { source })?
        .validate()
}

// ---------------------------------------------------------------------------
// Environment variable loader
// ---------------------------------------------------------------------------

/// Load an [`EngineConfig`] from `LICENSEMAP_`-prefixed environment variables.
///
/// Unset variables fall back to their defaults.
///
/// # Errors
///
/// Returns a [`ConfigError::ParseField`] if any variable is set to a value
/// that cannot be parsed, or a [`ConfigError::InvalidRange`] for a zero
/// factor.
pub fn load_config_from_env() -> Result<EngineConfig, ConfigError> {
    EngineConfig {
        named_user_factor: read_env_u32("LICENSEMAP_NAMED_USER_FACTOR", default_named_user_factor())?,
        agreement_cluster_charge: read_env_charge(
            "LICENSEMAP_AGREEMENT_CLUSTER_CHARGE",
            default_agreement_cluster_charge(),
        )?,
        contract_cluster_charge: read_env_charge(
            "LICENSEMAP_CONTRACT_CLUSTER_CHARGE",
            default_contract_cluster_charge(),
        )?,
    }
    .validate()
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn read_env_u32(key: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u32>().map_err(|source| ConfigError::ParseField {
            field: key.to_owned(),
            value: val.clone(),
            reason: source.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn read_env_charge(key: &str, default: ClusterCharge) -> Result<ClusterCharge, ConfigError> {
    match std::env::var(key) {
        Ok(val) => parse_charge(&val).ok_or_else(|| ConfigError::ParseField {
            field: key.to_owned(),
            value: val.clone(),
            reason: "expected one of: decrement-availability, record-only".into(),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_charge(value: &str) -> Option<ClusterCharge> {
    match value.trim().to_ascii_lowercase().as_str() {
        "decrement-availability" | "decrement" => Some(ClusterCharge::DecrementAvailability),
        "record-only" | "record" => Some(ClusterCharge::RecordOnly),
        _ => None,
    }
}
