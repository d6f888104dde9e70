//! Importer configuration.
//!
//! A single [`ImporterProperties`] value carries every behavior toggle and is passed by
//! reference through dispatch, so a run is reproducible from this one object.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Prefix of environment overrides, e.g. `MIRROR_IMPORTER_PERSIST__TOKENS=false`.
pub const ENV_PREFIX: &str = "MIRROR_IMPORTER";

/// Highest file number treated as a system file.
pub const MAX_SYSTEM_FILE_NUM: i64 = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterProperties {
    pub shard: i64,
    pub realm: i64,
    pub persist: PersistProperties,
}

impl ImporterProperties {
    /// Loads properties from an optional TOML file plus `MIRROR_IMPORTER_*` overrides.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Whether a file id falls in the system file range of the configured shard/realm.
    pub fn is_system_file(&self, shard: i64, realm: i64, num: i64) -> bool {
        shard == self.shard && realm == self.realm && (1..=MAX_SYSTEM_FILE_NUM).contains(&num)
    }
}

/// Feature toggles gating emission of each record family. All default to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistProperties {
    pub contracts: bool,
    pub contract_results: bool,
    pub ethereum_transactions: bool,
    pub files: bool,
    pub system_files: bool,
    pub hooks: bool,
    pub live_hashes: bool,
    pub nodes: bool,
    pub prng: bool,
    pub schedules: bool,
    pub synthetic_contract_logs: bool,
    pub token_airdrops: bool,
    pub tokens: bool,
    pub topics: bool,
    pub topic_messages: bool,
    pub transaction_signatures: bool,
}

impl Default for PersistProperties {
    fn default() -> Self {
        Self {
            contracts: true,
            contract_results: true,
            ethereum_transactions: true,
            files: true,
            system_files: true,
            hooks: true,
            live_hashes: true,
            nodes: true,
            prng: true,
            schedules: true,
            synthetic_contract_logs: true,
            token_airdrops: true,
            tokens: true,
            topics: true,
            topic_messages: true,
            transaction_signatures: true,
        }
    }
}
