use std::{fs, io::Write, path::Path};

use crate::{config::RunConfig, error::ConfigError};

/// Load configuration from file
pub fn load_config(config_file: &Path) -> Result<RunConfig, ConfigError> {
    let content =
        fs::read_to_string(config_file).map_err(|_| ConfigError::OpenFile(config_file.into()))?;
    toml::from_str(&content)
        .map_err(|e| ConfigError::Parse { path: config_file.into(), reason: e.to_string() })
}

/// Save configuration to file
pub fn save_config(config_file: &Path, config: &RunConfig) -> Result<(), ConfigError> {
    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))?;
    save(config_file, &content)
}

fn save(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent_dir) = path.parent() &&
        !parent_dir.as_os_str().is_empty()
    {
        fs::create_dir_all(parent_dir)
            .map_err(|_| ConfigError::ParentDir(parent_dir.to_path_buf()))?;
    }

    let mut f = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|_| ConfigError::OpenFile(path.to_path_buf()))?;

    f.write_all(data.as_bytes()).map_err(|_| ConfigError::WriteFile(path.to_path_buf()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogLevel, RuntimeConfig};

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cobalt.toml");

        let mut config = RunConfig::default();
        config.chain.chain_id = 1337;
        config.forks.prague = Some(100);
        config.logging.level = LogLevel::Trace;
        config.runtime = RuntimeConfig::MultiThreaded { worker_threads: 2 };
        save_config(&path, &config).unwrap();

        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[chain]\nchain_id = \"seven\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(&err, ConfigError::Parse { path: p, .. } if *p == path));
        let missing = load_config(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::OpenFile(_))));
    }
}
