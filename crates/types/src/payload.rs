//! Version-agnostic execution payload.
//!
//! The Engine API uses a different payload struct per version. The harness
//! keeps one superset ([`ExecutableData`]) and converts at the edge, failing
//! with an error when a field cannot be represented in the requested version.

use alloy_consensus::{
    EMPTY_OMMER_ROOT_HASH, Header, TxEnvelope,
    proofs::{calculate_transaction_root, calculate_withdrawals_root},
};
use alloy_eips::{eip2718::Decodable2718, eip7685::Requests};
use alloy_primitives::B64;
use alloy_rpc_types_engine::{ExecutionPayloadV1, ExecutionPayloadV2, ExecutionPayloadV3};

use crate::{
    aliases::{Address, B256, Bloom, Bytes, U256, Withdrawal},
    blob::BlobsBundle,
    error::BlobTypeError,
};

/// An execution payload plus the side parameters `engine_newPayload` takes
/// next to it (beacon root, execution requests).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutableData {
    pub parent_hash: B256,
    pub fee_recipient: Address,
    pub state_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub prev_randao: B256,
    pub block_number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub base_fee_per_gas: U256,
    pub block_hash: B256,
    pub transactions: Vec<Bytes>,
    /// Present from Shanghai.
    pub withdrawals: Option<Vec<Withdrawal>>,
    /// Present from Cancun.
    pub blob_gas_used: Option<u64>,
    /// Present from Cancun.
    pub excess_blob_gas: Option<u64>,
    /// `engine_newPayloadV3+` parameter, not part of the payload object.
    pub parent_beacon_block_root: Option<B256>,
    /// `engine_newPayloadV4` parameter, not part of the payload object.
    pub execution_requests: Option<Vec<Bytes>>,
}

impl ExecutableData {
    pub fn from_v1(payload: ExecutionPayloadV1) -> Self {
        Self {
            parent_hash: payload.parent_hash,
            fee_recipient: payload.fee_recipient,
            state_root: payload.state_root,
            receipts_root: payload.receipts_root,
            logs_bloom: payload.logs_bloom,
            prev_randao: payload.prev_randao,
            block_number: payload.block_number,
            gas_limit: payload.gas_limit,
            gas_used: payload.gas_used,
            timestamp: payload.timestamp,
            extra_data: payload.extra_data,
            base_fee_per_gas: payload.base_fee_per_gas,
            block_hash: payload.block_hash,
            transactions: payload.transactions,
            ..Default::default()
        }
    }

    pub fn from_v2(payload: ExecutionPayloadV2) -> Self {
        Self { withdrawals: Some(payload.withdrawals), ..Self::from_v1(payload.payload_inner) }
    }

    pub fn from_v3(payload: ExecutionPayloadV3, parent_beacon_block_root: Option<B256>) -> Self {
        Self {
            blob_gas_used: Some(payload.blob_gas_used),
            excess_blob_gas: Some(payload.excess_blob_gas),
            parent_beacon_block_root,
            ..Self::from_v2(payload.payload_inner)
        }
    }

    /// Downgrade to a V1 payload. Withdrawals and blob gas fields have no V1
    /// representation and are rejected instead of dropped.
    pub fn try_into_v1(&self) -> Result<ExecutionPayloadV1, BlobTypeError> {
        if self.withdrawals.is_some() {
            return Err(BlobTypeError::UnsupportedPayloadField { version: 1, field: "withdrawals" });
        }
        self.reject_blob_fields(1)?;
        Ok(self.v1_inner())
    }

    pub fn try_into_v2(&self) -> Result<ExecutionPayloadV2, BlobTypeError> {
        self.reject_blob_fields(2)?;
        Ok(ExecutionPayloadV2 {
            payload_inner: self.v1_inner(),
            withdrawals: self
                .withdrawals
                .clone()
                .ok_or(BlobTypeError::MissingPayloadField { version: 2, field: "withdrawals" })?,
        })
    }

    pub fn try_into_v3(&self) -> Result<ExecutionPayloadV3, BlobTypeError> {
        let missing = |field| BlobTypeError::MissingPayloadField { version: 3, field };
        Ok(ExecutionPayloadV3 {
            payload_inner: ExecutionPayloadV2 {
                payload_inner: self.v1_inner(),
                withdrawals: self.withdrawals.clone().ok_or_else(|| missing("withdrawals"))?,
            },
            blob_gas_used: self.blob_gas_used.ok_or_else(|| missing("blobGasUsed"))?,
            excess_blob_gas: self.excess_blob_gas.ok_or_else(|| missing("excessBlobGas"))?,
        })
    }

    fn reject_blob_fields(&self, version: u8) -> Result<(), BlobTypeError> {
        if self.blob_gas_used.is_some() {
            return Err(BlobTypeError::UnsupportedPayloadField { version, field: "blobGasUsed" });
        }
        if self.excess_blob_gas.is_some() {
            return Err(BlobTypeError::UnsupportedPayloadField { version, field: "excessBlobGas" });
        }
        Ok(())
    }

    fn v1_inner(&self) -> ExecutionPayloadV1 {
        ExecutionPayloadV1 {
            parent_hash: self.parent_hash,
            fee_recipient: self.fee_recipient,
            state_root: self.state_root,
            receipts_root: self.receipts_root,
            logs_bloom: self.logs_bloom,
            prev_randao: self.prev_randao,
            block_number: self.block_number,
            gas_limit: self.gas_limit,
            gas_used: self.gas_used,
            timestamp: self.timestamp,
            extra_data: self.extra_data.clone(),
            base_fee_per_gas: self.base_fee_per_gas,
            block_hash: self.block_hash,
            transactions: self.transactions.clone(),
        }
    }

    /// Decodes every transaction, naming the index of the first one that fails.
    pub fn decode_transactions(&self) -> Result<Vec<TxEnvelope>, BlobTypeError> {
        self.transactions
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                TxEnvelope::decode_2718_exact(raw.as_ref()).map_err(|e| {
                    BlobTypeError::TransactionDecode { index, reason: e.to_string() }
                })
            })
            .collect()
    }

    /// Rebuilds the block header from the payload fields and hashes it.
    pub fn compute_block_hash(&self) -> Result<B256, BlobTypeError> {
        let transactions = self.decode_transactions()?;
        let header = Header {
            parent_hash: self.parent_hash,
            ommers_hash: EMPTY_OMMER_ROOT_HASH,
            beneficiary: self.fee_recipient,
            state_root: self.state_root,
            transactions_root: calculate_transaction_root(&transactions),
            receipts_root: self.receipts_root,
            logs_bloom: self.logs_bloom,
            difficulty: U256::ZERO,
            number: self.block_number,
            gas_limit: self.gas_limit,
            gas_used: self.gas_used,
            timestamp: self.timestamp,
            extra_data: self.extra_data.clone(),
            mix_hash: self.prev_randao,
            nonce: B64::ZERO,
            base_fee_per_gas: Some(self.base_fee_per_gas.saturating_to()),
            withdrawals_root: self.withdrawals.as_deref().map(calculate_withdrawals_root),
            blob_gas_used: self.blob_gas_used,
            excess_blob_gas: self.excess_blob_gas,
            parent_beacon_block_root: self.parent_beacon_block_root,
            requests_hash: self
                .execution_requests
                .as_ref()
                .map(|requests| Requests::from_requests(requests.iter().cloned()).requests_hash()),
        };
        Ok(header.hash_slow())
    }

    /// Recomputes and stores the block hash after a field was modified.
    pub fn reseal(&mut self) -> Result<(), BlobTypeError> {
        self.block_hash = self.compute_block_hash()?;
        Ok(())
    }
}

/// Response of `engine_getPayload`: the payload and, from V3, its blobs bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltPayload {
    pub payload: ExecutableData,
    pub block_value: U256,
    pub blobs_bundle: Option<BlobsBundle>,
    pub should_override_builder: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cancun_payload() -> ExecutableData {
        ExecutableData {
            block_number: 7,
            gas_limit: 30_000_000,
            timestamp: 1_700_000_000,
            base_fee_per_gas: U256::from(7u64),
            withdrawals: Some(vec![]),
            blob_gas_used: Some(0),
            excess_blob_gas: Some(0),
            parent_beacon_block_root: Some(B256::repeat_byte(0xbe)),
            ..Default::default()
        }
    }

    /// Downgrading must fail instead of silently dropping fields.
    #[test]
    fn downgrade_with_withdrawals_is_an_error() {
        let payload = cancun_payload();
        assert!(matches!(
            payload.try_into_v1().unwrap_err(),
            BlobTypeError::UnsupportedPayloadField { version: 1, field: "withdrawals" }
        ));
        assert!(matches!(
            payload.try_into_v2().unwrap_err(),
            BlobTypeError::UnsupportedPayloadField { version: 2, field: "blobGasUsed" }
        ));
    }

    #[test]
    fn v3_roundtrip_keeps_blob_fields() {
        let payload = cancun_payload();
        let v3 = payload.try_into_v3().unwrap();
        let back = ExecutableData::from_v3(v3, payload.parent_beacon_block_root);
        assert_eq!(back, payload);
    }

    #[test]
    fn v3_requires_blob_fields() {
        let payload = ExecutableData { excess_blob_gas: None, ..cancun_payload() };
        assert!(matches!(
            payload.try_into_v3().unwrap_err(),
            BlobTypeError::MissingPayloadField { version: 3, field: "excessBlobGas" }
        ));
    }

    #[test]
    fn block_hash_tracks_header_fields() {
        let mut payload = cancun_payload();
        payload.reseal().unwrap();
        let original = payload.block_hash;
        assert_eq!(payload.compute_block_hash().unwrap(), original);

        payload.excess_blob_gas = Some(1);
        assert_ne!(payload.compute_block_hash().unwrap(), original);
    }

    #[test]
    fn undecodable_transaction_names_its_index() {
        let payload = ExecutableData {
            transactions: vec![Bytes::from_static(&[0x03, 0xff])],
            ..cancun_payload()
        };
        assert!(matches!(
            payload.decode_transactions().unwrap_err(),
            BlobTypeError::TransactionDecode { index: 0, .. }
        ));
    }
}
