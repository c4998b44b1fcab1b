//! Payload tampering for negative tests.

use std::fmt;

use alloy_primitives::{B256, Bytes};
use cobalt_types::{BlobTypeError, payload::ExecutableData};

/// Produces a modified copy of a built payload.
pub trait PayloadCustomizer: Send + Sync + fmt::Debug {
    fn customize_payload(&self, payload: &ExecutableData) -> Result<ExecutableData, BlobTypeError>;
}

/// Field overrides applied on top of a built payload.
///
/// Unset fields are copied. The block hash is recomputed afterwards so the
/// result is a structurally valid block that only differs in the chosen
/// fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomPayloadData {
    pub timestamp: Option<u64>,
    pub blob_gas_used: Option<u64>,
    pub excess_blob_gas: Option<u64>,
    pub parent_beacon_block_root: Option<B256>,
    pub extra_data: Option<Bytes>,
    pub transactions: Option<Vec<Bytes>>,
    pub remove_blob_gas_fields: bool,
    pub remove_parent_beacon_block_root: bool,
}

impl PayloadCustomizer for CustomPayloadData {
    fn customize_payload(&self, payload: &ExecutableData) -> Result<ExecutableData, BlobTypeError> {
        let mut custom = payload.clone();

        if let Some(timestamp) = self.timestamp {
            custom.timestamp = timestamp;
        }
        if let Some(extra_data) = &self.extra_data {
            custom.extra_data = extra_data.clone();
        }
        if let Some(transactions) = &self.transactions {
            custom.transactions = transactions.clone();
        }

        if self.remove_blob_gas_fields {
            custom.blob_gas_used = None;
            custom.excess_blob_gas = None;
        } else {
            if let Some(used) = self.blob_gas_used {
                custom.blob_gas_used = Some(used);
            }
            if let Some(excess) = self.excess_blob_gas {
                custom.excess_blob_gas = Some(excess);
            }
        }

        if self.remove_parent_beacon_block_root {
            custom.parent_beacon_block_root = None;
        } else if let Some(root) = self.parent_beacon_block_root {
            custom.parent_beacon_block_root = Some(root);
        }

        custom.reseal()?;
        Ok(custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ExecutableData {
        let mut payload = ExecutableData {
            block_number: 1,
            timestamp: 12,
            gas_limit: 30_000_000,
            withdrawals: Some(vec![]),
            blob_gas_used: Some(0),
            excess_blob_gas: Some(0),
            parent_beacon_block_root: Some(B256::ZERO),
            ..Default::default()
        };
        payload.reseal().unwrap();
        payload
    }

    #[test]
    fn overrides_fields_and_reseals() {
        let original = payload();
        let custom = CustomPayloadData { excess_blob_gas: Some(0x20000), ..Default::default() }
            .customize_payload(&original)
            .unwrap();

        assert_eq!(custom.excess_blob_gas, Some(0x20000));
        assert_eq!(custom.blob_gas_used, Some(0));
        assert_ne!(custom.block_hash, original.block_hash);
        assert_eq!(custom.block_hash, custom.compute_block_hash().unwrap());
    }

    #[test]
    fn removal_wins_over_override() {
        let custom = CustomPayloadData {
            remove_blob_gas_fields: true,
            blob_gas_used: Some(1),
            remove_parent_beacon_block_root: true,
            ..Default::default()
        }
        .customize_payload(&payload())
        .unwrap();

        assert_eq!(custom.blob_gas_used, None);
        assert_eq!(custom.excess_blob_gas, None);
        assert_eq!(custom.parent_beacon_block_root, None);
    }

    #[test]
    fn undecodable_transactions_are_reported() {
        let err = CustomPayloadData {
            transactions: Some(vec![Bytes::from_static(&[0x03, 0xff])]),
            ..Default::default()
        }
        .customize_payload(&payload())
        .unwrap_err();
        assert!(matches!(err, BlobTypeError::TransactionDecode { index: 0, .. }));
    }
}
