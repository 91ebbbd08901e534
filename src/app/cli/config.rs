//! TOML configuration file loading
//!
//! The file is parsed into a `toml::Table` and applied key by key onto a
//! `RouterConfig`. Command-line flags are merged on top afterwards.
//!
//! ```toml
//! strategy = "hash-partitioned"
//! instance-id = "node-a"
//! catch-all = true
//! log-level = "info"
//!
//! [worker-count]
//! securityaggregation = 6
//! securitymapping = 6
//! ```

use crate::routing::api::{ProcessType, RoutingError, RoutingResult};
use crate::topology::api::{TopologySettings, TopologyStrategy};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::args::Args;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Error reading configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Error in configuration file {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: RoutingError,
    },
}

/// Settings gathered from the configuration file and command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterConfig {
    pub strategy: Option<TopologyStrategy>,
    pub instance_id: Option<String>,
    pub catch_all: Option<bool>,
    pub worker_counts: BTreeMap<ProcessType, usize>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub log_file: Option<PathBuf>,
    pub color: Option<bool>,
}

/// `<config_dir>/Psprouter/psprouter.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Psprouter").join("psprouter.toml"))
}

/// Read and parse the configuration file
///
/// An explicitly named file must exist. The default location is optional:
/// `Ok(None)` when nothing is there.
pub async fn load_config_table(
    config_file: Option<&Path>,
) -> Result<Option<(PathBuf, toml::Table)>, ConfigError> {
    let path = match config_file {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };

    let contents = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
    let table = toml::from_str::<toml::Table>(&contents).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(Some((path, table)))
}

impl RouterConfig {
    /// Load the configuration file, if any, into a fresh config
    pub async fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some((path, table)) = load_config_table(config_file).await? {
            config
                .apply_toml_values(&table)
                .map_err(|source| ConfigError::Invalid { path, source })?;
        }
        Ok(config)
    }

    /// Apply TOML configuration values
    pub fn apply_toml_values(&mut self, config: &toml::Table) -> RoutingResult<()> {
        if let Some(strategy) = config.get("strategy") {
            let name = strategy
                .as_str()
                .ok_or_else(|| RoutingError::invalid_topology("strategy must be a string"))?;
            self.strategy = Some(name.parse()?);
        }
        if let Some(instance_id) = config.get("instance-id") {
            let instance_id = instance_id
                .as_str()
                .ok_or_else(|| RoutingError::invalid_topology("instance-id must be a string"))?;
            self.instance_id = Some(instance_id.to_string());
        }
        if let Some(catch_all) = config.get("catch-all") {
            let catch_all = catch_all
                .as_bool()
                .ok_or_else(|| RoutingError::invalid_topology("catch-all must be a boolean"))?;
            self.catch_all = Some(catch_all);
        }
        if let Some(counts) = config.get("worker-count") {
            let table = counts
                .as_table()
                .ok_or_else(|| RoutingError::invalid_topology("[worker-count] must be a table"))?;
            for (name, value) in table {
                let process_type: ProcessType = name.parse().map_err(|_| {
                    RoutingError::invalid_topology(format!(
                        "unknown process type '{}' in [worker-count]",
                        name
                    ))
                })?;
                let count = value
                    .as_integer()
                    .filter(|count| *count > 0)
                    .ok_or_else(|| {
                        RoutingError::invalid_topology(format!(
                            "worker count for {} must be a positive integer",
                            process_type.token()
                        ))
                    })?;
                self.worker_counts.insert(process_type, count as usize);
            }
        }

        if let Some(log_level) = config.get("log-level").and_then(|v| v.as_str()) {
            self.log_level = Some(log_level.to_string());
        }
        if let Some(log_format) = config.get("log-format").and_then(|v| v.as_str()) {
            self.log_format = Some(log_format.to_string());
        }
        if let Some(log_file) = config.get("log-file").and_then(|v| v.as_str()) {
            if log_file.eq_ignore_ascii_case("none") || log_file == "-" {
                self.log_file = None; // "none" and "-" disable file logging
            } else {
                self.log_file = Some(PathBuf::from(log_file));
            }
        }
        if let Some(color) = config.get("color").and_then(|v| v.as_bool()) {
            self.color = Some(color);
        }
        Ok(())
    }

    /// Overlay command-line values; flags win over the file
    pub fn merge_args(&mut self, args: &Args) -> RoutingResult<()> {
        if let Some(strategy) = &args.strategy {
            self.strategy = Some(strategy.parse()?);
        }
        if let Some(instance_id) = &args.instance_id {
            self.instance_id = Some(instance_id.clone());
        }
        if args.no_catch_all {
            self.catch_all = Some(false);
        }
        for (process_type, count) in &args.worker_counts {
            self.worker_counts.insert(*process_type, *count);
        }
        if args.log_level.is_some() {
            self.log_level = args.log_level.clone();
        }
        if args.log_format.is_some() {
            self.log_format = args.log_format.clone();
        }
        if args.log_file.is_some() {
            self.log_file = args.log_file.clone();
        }
        if args.color.is_some() {
            self.color = args.color;
        }
        Ok(())
    }

    /// Topology settings for the core
    ///
    /// `default_instance_id` is only consulted for the per-instance strategy
    /// when no identifier was configured.
    pub fn topology_settings<F>(&self, default_instance_id: F) -> TopologySettings
    where
        F: FnOnce() -> String,
    {
        let strategy = self.strategy.unwrap_or_default();
        let mut settings =
            TopologySettings::new(strategy).with_catch_all(self.catch_all.unwrap_or(true));
        settings.worker_counts = self.worker_counts.clone();
        settings.instance_id = match (&self.instance_id, strategy) {
            (Some(id), _) => Some(id.clone()),
            (None, TopologyStrategy::PerInstance) => Some(default_instance_id()),
            (None, _) => None,
        };
        settings
    }
}
