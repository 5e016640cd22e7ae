//! Daemon configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `GDKBRIDGE_*` environment variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "GDKBRIDGE";
const CONFIG_PATH_VAR: &str = "GDKBRIDGE_CONFIG";
const FALLBACK_DB_PATH: &str = "~/.gdkbridge/saves.db";

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    pub db_path: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    /// JSON platform fixture; the built-in demo platform when unset
    pub fixture_path: Option<String>,
    pub update_interval_ms: u64,
    pub stats_flush_interval_secs: u64,
    pub rate_limit_burst: u32,
    pub rate_limit_rate: u32,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "gdkbridge")
}

fn default_db_path() -> String {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("saves.db").display().to_string())
        .unwrap_or_else(|| FALLBACK_DB_PATH.to_string())
}

/// `GDKBRIDGE_CONFIG`, else `<config_dir>/gdkbridge.toml`
fn default_config_file() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_VAR)
        .ok()
        .map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned()))
        .or_else(|| project_dirs().map(|dirs| dirs.config_dir().join("gdkbridge.toml")))
}

impl DaemonConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_file().as_deref(), None)
    }

    /// `env` replaces the process environment when given
    pub fn load_from(file: Option<&Path>, env: Option<config::Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())?
            .set_default("rpc_host", "127.0.0.1")?
            .set_default("rpc_port", 9600_i64)?
            .set_default("update_interval_ms", 16_i64)?
            .set_default("stats_flush_interval_secs", 300_i64)?
            .set_default("rate_limit_burst", 200_i64)?
            .set_default("rate_limit_rate", 100_i64)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let config: DaemonConfig = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.update_interval_ms == 0 {
            anyhow::bail!("update_interval_ms must be positive");
        }
        if self.stats_flush_interval_secs == 0 {
            anyhow::bail!("stats_flush_interval_secs must be positive");
        }
        Ok(())
    }

    /// Database path with `~` expanded
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).into_owned())
    }

    pub fn fixture_path(&self) -> Option<PathBuf> {
        self.fixture_path
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn stats_flush_interval(&self) -> Duration {
        Duration::from_secs(self.stats_flush_interval_secs)
    }
}
