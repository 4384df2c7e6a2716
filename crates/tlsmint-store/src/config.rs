//! Store configuration loaded from TOML.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tlsmint_certgen::{LeafOptions, RootOptions};

use crate::store::{StoreOptions, STORE_CAP};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub root: RootConfig,
    #[serde(default)]
    pub leaf: LeafConfig,
    #[serde(default)]
    pub certs: Vec<StaticCertConfig>,
}

impl Config {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            capacity: self.store.capacity,
            leaf: self.leaf.to_options(),
        }
    }
}

/// Where the trust root lives and how large the cache may grow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Prefix of every persisted root file.
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            label: default_label(),
            capacity: default_capacity(),
        }
    }
}

/// Subject and lifetime of a newly generated root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootConfig {
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default = "default_expiry_days")]
    pub expiry_days: u32,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            organization: None,
            common_name: None,
            expiry_days: default_expiry_days(),
        }
    }
}

impl RootConfig {
    pub fn to_options(&self) -> RootOptions {
        RootOptions {
            organization: self.organization.clone(),
            common_name: self.common_name.clone(),
            validity: time::Duration::days(i64::from(self.expiry_days)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafConfig {
    #[serde(default = "default_expiry_days")]
    pub expiry_days: u32,
}

impl Default for LeafConfig {
    fn default() -> Self {
        Self {
            expiry_days: default_expiry_days(),
        }
    }
}

impl LeafConfig {
    pub fn to_options(&self) -> LeafOptions {
        LeafOptions {
            validity: time::Duration::days(i64::from(self.expiry_days)),
        }
    }
}

/// A certificate file registered at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticCertConfig {
    pub name: String,
    pub path: PathBuf,
}

fn default_directory() -> PathBuf {
    crate::setup::config_dir()
}

fn default_label() -> String {
    "tlsmint".to_string()
}

fn default_capacity() -> usize {
    STORE_CAP
}

fn default_expiry_days() -> u32 {
    3 * 365
}
