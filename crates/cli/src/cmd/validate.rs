use clap::Parser;
use cobalt_types::fork::{Fork, ForkConfig};
use tracing::info;

use crate::{config::RunConfig, error::ConfigError};

#[derive(Parser, Debug, Clone, Default, PartialEq)]
pub struct ValidateCmd {}

impl ValidateCmd {
    /// Checks the fork schedule and logs when each fork activates.
    pub fn run(&self, config: &RunConfig) -> Result<ForkConfig, ConfigError> {
        let forks = config.fork_config()?;
        let schedule = [
            (Fork::Shanghai, forks.shanghai_timestamp),
            (Fork::Cancun, forks.cancun_timestamp),
            (Fork::Prague, forks.prague_timestamp),
        ];
        for (fork, at) in schedule {
            match at {
                Some(timestamp) => info!(%fork, timestamp, "Fork scheduled"),
                None => info!(%fork, "Fork not scheduled"),
            }
        }
        info!(
            chain_id = config.chain.chain_id,
            accounts = config.chain.accounts,
            rpc_timeout_ms = config.engine.rpc_timeout_ms,
            "Configuration is valid"
        );
        Ok(forks)
    }
}
