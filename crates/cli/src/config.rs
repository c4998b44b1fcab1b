//! Run configuration.
//!
//! Loaded from a TOML file, then adjusted by `COBALT_*` environment
//! variables and finally by command-line flags.

use std::{fmt, path::PathBuf, time::Duration};

use clap::ValueEnum;
use cobalt_types::fork::ForkConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

pub const DEFAULT_CHAIN_ID: u64 = 7;
pub const DEFAULT_ACCOUNTS: u32 = 5;
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 10_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plaintext,
    Json,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "flavor", rename_all = "snake_case")]
pub enum RuntimeConfig {
    SingleThreaded,
    /// `worker_threads = 0` lets tokio pick one thread per core.
    MultiThreaded { worker_threads: usize },
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::MultiThreaded { worker_threads: 0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Number of mnemonic-derived accounts available to senders.
    pub accounts: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self { chain_id: DEFAULT_CHAIN_ID, accounts: DEFAULT_ACCOUNTS }
    }
}

/// Fork activation timestamps. An absent fork never activates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForksConfig {
    pub shanghai: Option<u64>,
    pub cancun: Option<u64>,
    pub prague: Option<u64>,
}

impl Default for ForksConfig {
    fn default() -> Self {
        let forks = ForkConfig::cancun_at_genesis();
        Self {
            shanghai: forks.shanghai_timestamp,
            cancun: forks.cancun_timestamp,
            prague: forks.prague_timestamp,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rpc_timeout_ms: u64,
    pub get_payload_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS, get_payload_delay_ms: 0 }
    }
}

impl EngineConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn get_payload_delay(&self) -> Duration {
        Duration::from_millis(self.get_payload_delay_ms)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KzgConfig {
    /// JSON trusted setup. The bundled mainnet setup is used when unset.
    pub trusted_setup_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub chain: ChainConfig,
    pub forks: ForksConfig,
    pub engine: EngineConfig,
    pub kzg: KzgConfig,
    pub logging: LoggingConfig,
    pub runtime: RuntimeConfig,
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    let value = env_value(key)?;
    match value.parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(key, value = %value, "Invalid numeric override, ignoring");
            None
        }
    }
}

impl RunConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported variables:
    /// - COBALT_CHAIN_ID
    /// - COBALT_SHANGHAI_TIMESTAMP
    /// - COBALT_CANCUN_TIMESTAMP
    /// - COBALT_PRAGUE_TIMESTAMP
    /// - COBALT_RPC_TIMEOUT_MS
    /// - COBALT_LOG_LEVEL
    pub fn apply_env_overrides(&mut self) {
        if let Some(chain_id) = env_u64("COBALT_CHAIN_ID") {
            self.chain.chain_id = chain_id;
        }
        if let Some(at) = env_u64("COBALT_SHANGHAI_TIMESTAMP") {
            self.forks.shanghai = Some(at);
        }
        if let Some(at) = env_u64("COBALT_CANCUN_TIMESTAMP") {
            self.forks.cancun = Some(at);
        }
        if let Some(at) = env_u64("COBALT_PRAGUE_TIMESTAMP") {
            self.forks.prague = Some(at);
        }
        if let Some(ms) = env_u64("COBALT_RPC_TIMEOUT_MS") {
            self.engine.rpc_timeout_ms = ms.max(1);
        }
        if let Some(v) = env_value("COBALT_LOG_LEVEL") {
            match LogLevel::from_str(&v, true) {
                Ok(level) => self.logging.level = level,
                Err(_) => warn!(value = %v, "Invalid COBALT_LOG_LEVEL, ignoring"),
            }
        }
    }

    /// The validated fork schedule.
    pub fn fork_config(&self) -> Result<ForkConfig, ConfigError> {
        let forks = ForkConfig {
            shanghai_timestamp: self.forks.shanghai,
            cancun_timestamp: self.forks.cancun,
            prague_timestamp: self.forks.prague,
        };
        forks.validate()?;
        Ok(forks)
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn with_env(vars: &[(&str, &str)], f: impl FnOnce()) {
        for (key, value) in vars {
            unsafe { std::env::set_var(key, value) };
        }
        f();
        for (key, _) in vars {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn empty_file_means_defaults() {
        let config: RunConfig = toml::from_str("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.fork_config().unwrap(), ForkConfig::cancun_at_genesis());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: RunConfig = toml::from_str(
            r#"
            [forks]
            cancun = 12

            [runtime]
            flavor = "single_threaded"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.forks.shanghai, Some(0));
        assert_eq!(config.forks.cancun, Some(12));
        assert_eq!(config.runtime, RuntimeConfig::SingleThreaded);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.chain.chain_id, DEFAULT_CHAIN_ID);
    }

    #[test]
    fn out_of_order_forks_are_rejected() {
        let mut config = RunConfig::default();
        config.forks.shanghai = Some(10);
        config.forks.cancun = Some(5);
        assert!(matches!(config.fork_config(), Err(ConfigError::Forks(_))));

        config.forks = ForksConfig { shanghai: None, cancun: Some(5), prague: None };
        assert!(config.fork_config().is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        let mut config = RunConfig::default();
        with_env(
            &[
                ("COBALT_CHAIN_ID", "1337"),
                ("COBALT_CANCUN_TIMESTAMP", " 30 "),
                ("COBALT_RPC_TIMEOUT_MS", "0"),
                ("COBALT_LOG_LEVEL", "DEBUG"),
            ],
            || config.apply_env_overrides(),
        );

        assert_eq!(config.chain.chain_id, 1337);
        assert_eq!(config.forks.cancun, Some(30));
        assert_eq!(config.engine.rpc_timeout_ms, 1);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    #[serial]
    fn invalid_env_values_are_ignored() {
        let mut config = RunConfig::default();
        with_env(
            &[
                ("COBALT_CHAIN_ID", "seven"),
                ("COBALT_LOG_LEVEL", "loud"),
                ("COBALT_PRAGUE_TIMESTAMP", ""),
            ],
            || config.apply_env_overrides(),
        );
        assert_eq!(config, RunConfig::default());
    }
}
