use crate::aggregator::SortOrder;
use crate::probe::ProbeBackend;
use anyhow::{ensure, Context, Result};
use config::{Config as RConfig, ConfigBuilder, Environment, File, FileFormat};
use pipemon_common::constants::{
    IDLE_TIMEOUT_MS, MULTICAST_GROUP, MULTICAST_PORT, MULTICAST_TTL, PROBE_CONCURRENCY,
    PROBE_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV_PREFIX: &str = "PIPEMON";
const DEFAULT_CONFIG_FILE_LOCATION_FROM_HOME: &str = ".config/pipemon/pipemon.toml";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub multicast_group: Ipv4Addr,
    pub multicast_port: u16,
    pub multicast_ttl: u32,
    pub idle_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub probe_concurrency: usize,
    pub probe_backend: ProbeBackend,
    pub sort_order: SortOrder,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn group_addr(&self) -> SocketAddr {
        SocketAddr::from((self.multicast_group, self.multicast_port))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.multicast_group.is_multicast(),
            "multicast_group {} is not a multicast address",
            self.multicast_group
        );
        ensure!(self.multicast_ttl > 0, "multicast_ttl must be at least 1");
        ensure!(self.idle_timeout_ms > 0, "idle_timeout_ms must be positive");
        ensure!(self.probe_timeout_ms > 0, "probe_timeout_ms must be positive");
        ensure!(
            self.probe_concurrency > 0,
            "probe_concurrency must be at least 1"
        );
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    fn get_default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_FILE_LOCATION_FROM_HOME))
    }

    fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>> {
        Ok(RConfig::builder()
            .set_default("multicast_group", MULTICAST_GROUP.to_string())?
            .set_default("multicast_port", i64::from(MULTICAST_PORT))?
            .set_default("multicast_ttl", i64::from(MULTICAST_TTL))?
            .set_default("idle_timeout_ms", IDLE_TIMEOUT_MS as i64)?
            .set_default("probe_timeout_ms", PROBE_TIMEOUT_MS as i64)?
            .set_default("probe_concurrency", PROBE_CONCURRENCY as i64)?
            .set_default("probe_backend", "ps")?
            .set_default("sort_order", "elapsed")?
            .set_default("log_level", "info")?)
    }

    /// Loads defaults, then the config file, then `PIPEMON_*` environment variables.
    ///
    /// An explicit `path` must exist; the default location in the home directory is optional.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut builder = Self::builder_with_defaults()?;

        match path {
            Some(path) => {
                builder = builder.add_source(
                    File::new(&path.to_string_lossy(), FileFormat::Toml).required(true),
                );
            }
            None => {
                if let Some(default_path) = Self::get_default_config_path() {
                    builder = builder.add_source(
                        File::new(&default_path.to_string_lossy(), FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(CONFIG_ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config: Config = builder
            .build()?
            .try_deserialize()
            .context("failed to parse config file")?;
        config.validate()?;

        Ok(config)
    }

    #[cfg(test)]
    pub(crate) fn load_default_config() -> Result<Config> {
        let config: Config = Self::builder_with_defaults()?
            .build()?
            .try_deserialize()
            .context("failed to build default config")?;
        config.validate()?;
        Ok(config)
    }
}
