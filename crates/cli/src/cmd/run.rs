use clap::Parser;

use crate::config::RunConfig;

#[derive(Parser, Debug, Clone, Default, PartialEq)]
pub struct RunCmd {
    /// Only run scenarios whose name contains one of these filters
    #[arg(long = "scenario", short = 's')]
    pub scenarios: Vec<String>,

    /// Print the scenario names and exit
    #[arg(long)]
    pub list: bool,

    /// Use the hash-based commitment stand-in instead of real KZG
    #[arg(long)]
    pub fake_kzg: bool,

    /// Override the chain id
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// Delay between requesting a payload build and fetching it
    #[arg(long)]
    pub get_payload_delay_ms: Option<u64>,
}

impl RunCmd {
    pub fn apply_overrides(&self, config: &mut RunConfig) {
        if let Some(chain_id) = self.chain_id {
            config.chain.chain_id = chain_id;
        }
        if let Some(delay) = self.get_payload_delay_ms {
            config.engine.get_payload_delay_ms = delay;
        }
    }

    /// Whether the scenario called `name` was selected.
    pub fn selects(&self, name: &str) -> bool {
        self.scenarios.is_empty() || self.scenarios.iter().any(|f| name.contains(f.as_str()))
    }
}
