use std::path::Path;

use clap::Parser;
use tracing::info;

use crate::{config::RunConfig, error::ConfigError, file::save_config};

#[derive(Parser, Debug, Clone, Default, PartialEq)]
pub struct InitCmd {
    /// Replace an existing configuration file
    #[arg(long)]
    pub overwrite: bool,
}

impl InitCmd {
    /// Writes the default configuration to `config_file`.
    pub fn run(&self, config_file: &Path) -> Result<(), ConfigError> {
        if config_file.exists() && !self.overwrite {
            return Err(ConfigError::AlreadyExists(config_file.to_path_buf()));
        }

        save_config(config_file, &RunConfig::default())?;
        info!(file = %config_file.display(), "Wrote default configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::load_config;

    #[test]
    fn refuses_to_clobber_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cobalt.toml");

        InitCmd::default().run(&path).unwrap();
        assert_eq!(load_config(&path).unwrap(), RunConfig::default());

        let err = InitCmd::default().run(&path).unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyExists(_)));
        InitCmd { overwrite: true }.run(&path).unwrap();
    }
}
