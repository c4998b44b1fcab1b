//! Command-line arguments shared by every subcommand.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use crate::{
    cmd::{init::InitCmd, run::RunCmd, validate::ValidateCmd},
    config::{LogFormat, LogLevel, RunConfig},
    error::ConfigError,
    file::load_config,
};

pub const DEFAULT_CONFIG_FILE: &str = "cobalt.toml";

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "cobalt", version, about = "Engine API blob conformance runner")]
pub struct Args {
    /// Run configuration file
    #[arg(long, short, global = true, env = "COBALT_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log level for the cobalt crates (overrides the configuration file)
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Log output format (overrides the configuration file)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Write a default configuration file
    Init(InitCmd),
    /// Check the configuration and print the fork schedule
    Validate(ValidateCmd),
    /// Run the blob scenario suite
    Run(RunCmd),
}

impl Args {
    pub fn new() -> Self {
        Self::parse()
    }

    pub fn config_file(&self) -> &Path {
        &self.config
    }

    /// The effective configuration: file (or defaults when the file does not
    /// exist), then environment, then logging flags.
    pub fn load_config(&self) -> Result<RunConfig, ConfigError> {
        let mut config = if self.config.exists() {
            let config = load_config(&self.config)?;
            info!(file = %self.config.display(), "Loaded configuration");
            config
        } else {
            debug!(file = %self.config.display(), "No configuration file, using defaults");
            RunConfig::default()
        };

        config.apply_env_overrides();
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        Ok(config)
    }
}

impl Default for Args {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::file::save_config;

    #[test]
    fn global_flags_follow_the_subcommand() {
        let args = Args::try_parse_from([
            "cobalt",
            "run",
            "--fake-kzg",
            "--log-level",
            "debug",
            "--config",
            "/tmp/x.toml",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("/tmp/x.toml"));
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert!(matches!(args.command, Commands::Run(RunCmd { fake_kzg: true, .. })));
    }

    #[test]
    #[serial]
    fn flags_win_over_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cobalt.toml");
        let mut on_disk = RunConfig::default();
        on_disk.logging.level = LogLevel::Warn;
        on_disk.chain.chain_id = 99;
        save_config(&path, &on_disk).unwrap();

        let args = Args::try_parse_from([
            "cobalt",
            "--config",
            path.to_str().unwrap(),
            "--log-format",
            "json",
            "validate",
        ])
        .unwrap();
        let config = args.load_config().unwrap();

        assert_eq!(config.chain.chain_id, 99);
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    #[serial]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let args =
            Args::try_parse_from(["cobalt", "-c", path.to_str().unwrap(), "validate"]).unwrap();
        assert_eq!(args.load_config().unwrap(), RunConfig::default());
    }
}
