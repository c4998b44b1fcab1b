//! Fork activation and Engine API version policy.
//!
//! Every function here is a pure lookup keyed by block timestamp. A fork with
//! no configured activation time never activates.

use std::fmt;

use alloy_consensus::TxType;
use serde::{Deserialize, Serialize};

use crate::error::BlobTypeError;

/// Named protocol upgrades relevant to the Engine API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fork {
    /// The merge; Engine API V1.
    Paris,
    /// Withdrawals; Engine API V2.
    Shanghai,
    /// Blob transactions; Engine API V3.
    Cancun,
    /// Execution requests; Engine API V4.
    Prague,
}

impl Fork {
    /// The fork this one succeeded, if any.
    pub const fn previous(self) -> Option<Fork> {
        match self {
            Fork::Paris => None,
            Fork::Shanghai => Some(Fork::Paris),
            Fork::Cancun => Some(Fork::Shanghai),
            Fork::Prague => Some(Fork::Cancun),
        }
    }

    /// Engine API version introduced by this fork for payload calls.
    pub const fn payload_version(self) -> u8 {
        match self {
            Fork::Paris => 1,
            Fork::Shanghai => 2,
            Fork::Cancun => 3,
            Fork::Prague => 4,
        }
    }
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Fork::Paris => "Paris",
            Fork::Shanghai => "Shanghai",
            Fork::Cancun => "Cancun",
            Fork::Prague => "Prague",
        };
        f.write_str(name)
    }
}

/// Activation timestamps of the timestamp-scheduled forks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkConfig {
    pub shanghai_timestamp: Option<u64>,
    pub cancun_timestamp: Option<u64>,
    pub prague_timestamp: Option<u64>,
}

impl ForkConfig {
    /// All forks active from genesis up to and including Cancun.
    pub const fn cancun_at_genesis() -> Self {
        Self { shanghai_timestamp: Some(0), cancun_timestamp: Some(0), prague_timestamp: None }
    }

    fn active(activation: Option<u64>, timestamp: u64) -> bool {
        activation.is_some_and(|at| timestamp >= at)
    }

    pub fn is_shanghai(&self, timestamp: u64) -> bool {
        Self::active(self.shanghai_timestamp, timestamp)
    }

    pub fn is_cancun(&self, timestamp: u64) -> bool {
        Self::active(self.cancun_timestamp, timestamp)
    }

    pub fn is_prague(&self, timestamp: u64) -> bool {
        Self::active(self.prague_timestamp, timestamp)
    }

    /// Latest fork active at `timestamp`.
    pub fn fork_at(&self, timestamp: u64) -> Fork {
        if self.is_prague(timestamp) {
            Fork::Prague
        } else if self.is_cancun(timestamp) {
            Fork::Cancun
        } else if self.is_shanghai(timestamp) {
            Fork::Shanghai
        } else {
            Fork::Paris
        }
    }

    /// `engine_forkchoiceUpdated` version.
    ///
    /// The requested payload's timestamp wins when attributes are present;
    /// otherwise the head block's timestamp decides. There is no V4.
    pub fn forkchoice_updated_version(
        &self,
        head_timestamp: u64,
        payload_attributes_timestamp: Option<u64>,
    ) -> u8 {
        let timestamp = payload_attributes_timestamp.unwrap_or(head_timestamp);
        match self.fork_at(timestamp) {
            Fork::Prague | Fork::Cancun => 3,
            Fork::Shanghai => 2,
            Fork::Paris => 1,
        }
    }

    /// `engine_newPayload` version for a payload with this timestamp.
    pub fn new_payload_version(&self, timestamp: u64) -> u8 {
        self.fork_at(timestamp).payload_version()
    }

    /// `engine_getPayload` version for a payload with this timestamp.
    pub fn get_payload_version(&self, timestamp: u64) -> u8 {
        self.fork_at(timestamp).payload_version()
    }

    /// Whether blob-carrying transactions are a legal type at `timestamp`.
    pub fn blob_transactions_enabled(&self, timestamp: u64) -> bool {
        self.is_cancun(timestamp)
    }

    /// Transaction types the harness may send at `timestamp`.
    pub fn supported_transaction_types(&self, timestamp: u64) -> Vec<TxType> {
        if self.is_cancun(timestamp) {
            vec![TxType::Eip4844, TxType::Legacy, TxType::Eip1559]
        } else {
            vec![TxType::Legacy, TxType::Eip1559]
        }
    }

    /// Rejects schedules where a later fork activates before an earlier one,
    /// or where a fork is configured without its predecessors.
    pub fn validate(&self) -> Result<(), BlobTypeError> {
        let schedule = [
            (Fork::Shanghai, self.shanghai_timestamp),
            (Fork::Cancun, self.cancun_timestamp),
            (Fork::Prague, self.prague_timestamp),
        ];

        for pair in schedule.windows(2) {
            let (earlier, earlier_at) = pair[0];
            let (later, later_at) = pair[1];
            match (earlier_at, later_at) {
                (None, Some(_)) => {
                    return Err(BlobTypeError::InvalidForkConfig(format!(
                        "{later} is scheduled but {earlier} is not"
                    )));
                }
                (Some(e), Some(l)) if l < e => {
                    return Err(BlobTypeError::InvalidForkConfig(format!(
                        "{later} ({l}) activates before {earlier} ({e})"
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged() -> ForkConfig {
        ForkConfig {
            shanghai_timestamp: Some(10),
            cancun_timestamp: Some(20),
            prague_timestamp: Some(30),
        }
    }

    #[test]
    fn fork_boundaries_are_inclusive() {
        let config = staged();
        assert_eq!(config.fork_at(9), Fork::Paris);
        assert_eq!(config.fork_at(10), Fork::Shanghai);
        assert_eq!(config.fork_at(19), Fork::Shanghai);
        assert_eq!(config.fork_at(20), Fork::Cancun);
        assert_eq!(config.fork_at(30), Fork::Prague);
        assert_eq!(config.fork_at(u64::MAX), Fork::Prague);
    }

    #[test]
    fn payload_versions_increase_with_each_fork() {
        let config = staged();
        assert_eq!(config.new_payload_version(0), 1);
        assert_eq!(config.new_payload_version(10), 2);
        assert_eq!(config.new_payload_version(20), 3);
        assert_eq!(config.new_payload_version(30), 4);
        assert_eq!(config.get_payload_version(25), 3);
    }

    /// Attributes timestamp takes precedence over the head timestamp.
    #[test]
    fn forkchoice_version_prefers_attributes_timestamp() {
        let config = staged();
        assert_eq!(config.forkchoice_updated_version(15, None), 2);
        assert_eq!(config.forkchoice_updated_version(15, Some(20)), 3);
        assert_eq!(config.forkchoice_updated_version(25, Some(5)), 1);
        assert_eq!(config.forkchoice_updated_version(35, None), 3);
    }

    #[test]
    fn blob_transactions_gated_on_cancun() {
        let config = staged();
        assert!(!config.blob_transactions_enabled(19));
        assert!(config.blob_transactions_enabled(20));
        assert_eq!(config.supported_transaction_types(19), vec![TxType::Legacy, TxType::Eip1559]);
        assert_eq!(config.supported_transaction_types(20)[0], TxType::Eip4844);
    }

    #[test]
    fn unscheduled_fork_never_activates() {
        let config = ForkConfig::default();
        assert_eq!(config.fork_at(u64::MAX), Fork::Paris);
        assert!(!config.is_cancun(u64::MAX));
    }

    #[test]
    fn previous_fork_chain() {
        assert_eq!(Fork::Prague.previous(), Some(Fork::Cancun));
        assert_eq!(Fork::Shanghai.previous(), Some(Fork::Paris));
        assert_eq!(Fork::Paris.previous(), None);
    }

    #[test]
    fn validate_rejects_misordered_schedules() {
        assert!(staged().validate().is_ok());
        assert!(ForkConfig::cancun_at_genesis().validate().is_ok());
        assert!(ForkConfig::default().validate().is_ok());

        let inverted = ForkConfig { cancun_timestamp: Some(5), ..staged() };
        assert!(inverted.validate().is_err());

        let gap = ForkConfig {
            shanghai_timestamp: Some(0),
            cancun_timestamp: None,
            prague_timestamp: Some(0),
        };
        assert!(matches!(gap.validate().unwrap_err(), BlobTypeError::InvalidForkConfig(_)));
    }
}
