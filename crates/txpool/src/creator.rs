use alloy_consensus::{SignableTransaction, TxEip4844, TxEnvelope};
use alloy_network::TxSigner;
use alloy_primitives::{Address, Bytes, Signature, U256};
use cobalt_blob_engine::{BlobId, CommitmentEngine};
use cobalt_types::{
    constants::{BLOB_COMMITMENT_VERSION_KZG, BLOB_TX_GAS_LIMIT},
    transaction::TransactionWithBlobData,
};
use tracing::debug;

use crate::error::PoolError;

const DEFAULT_GAS_FEE_CAP: u128 = 30_000_000_000; // 30 gwei
const DEFAULT_GAS_TIP_CAP: u128 = 1_000_000_000; // 1 gwei
const DEFAULT_BLOB_GAS_FEE_CAP: u128 = 100; // wei

/// Parameters of one blob transaction.
///
/// Blobs are synthesized from `blob_id` upwards, so the caller decides which
/// identifiers the transaction carries (normally reserved from the pool).
#[derive(Clone, Debug)]
pub struct BlobTransactionCreator {
    pub to: Option<Address>,
    pub gas_limit: u64,
    pub gas_fee_cap: u128,
    pub gas_tip_cap: u128,
    pub blob_gas_fee_cap: u128,
    pub blob_id: BlobId,
    pub blob_count: u64,
    /// Version byte per blob for the hashes written into the transaction
    /// body. Missing entries use [`BLOB_COMMITMENT_VERSION_KZG`].
    pub hash_versions: Vec<u8>,
    pub value: U256,
    pub data: Bytes,
}

impl Default for BlobTransactionCreator {
    fn default() -> Self {
        Self {
            to: None,
            gas_limit: BLOB_TX_GAS_LIMIT,
            gas_fee_cap: DEFAULT_GAS_FEE_CAP,
            gas_tip_cap: DEFAULT_GAS_TIP_CAP,
            blob_gas_fee_cap: DEFAULT_BLOB_GAS_FEE_CAP,
            blob_id: BlobId::default(),
            blob_count: 1,
            hash_versions: Vec::new(),
            value: U256::ZERO,
            data: Bytes::new(),
        }
    }
}

impl BlobTransactionCreator {
    pub fn new(to: Address) -> Self {
        Self { to: Some(to), ..Default::default() }
    }

    pub fn with_blobs(mut self, blob_id: BlobId, blob_count: u64) -> Self {
        self.blob_id = blob_id;
        self.blob_count = blob_count;
        self
    }

    pub fn with_fees(
        mut self,
        gas_fee_cap: u128,
        gas_tip_cap: u128,
        blob_gas_fee_cap: u128,
    ) -> Self {
        self.gas_fee_cap = gas_fee_cap;
        self.gas_tip_cap = gas_tip_cap;
        self.blob_gas_fee_cap = blob_gas_fee_cap;
        self
    }

    pub fn with_hash_versions(mut self, versions: Vec<u8>) -> Self {
        self.hash_versions = versions;
        self
    }

    /// Builds and signs the transaction.
    ///
    /// The transaction's blob hash list is derived from the same commitments
    /// that end up in the returned wrap data.
    pub async fn make_transaction<S>(
        &self,
        engine: &CommitmentEngine,
        signer: &S,
        nonce: u64,
        chain_id: u64,
    ) -> Result<TransactionWithBlobData, PoolError>
    where
        S: TxSigner<Signature> + Send + Sync,
    {
        let to = self.to.ok_or(PoolError::MissingRecipient)?;

        let (wrap, _) = engine.wrap_data(self.blob_id, self.blob_count)?;
        let blob_versioned_hashes = wrap
            .commitments
            .iter()
            .enumerate()
            .map(|(i, c)| {
                c.versioned_hash(
                    self.hash_versions.get(i).copied().unwrap_or(BLOB_COMMITMENT_VERSION_KZG),
                )
            })
            .collect();

        let mut tx = TxEip4844 {
            chain_id,
            nonce,
            max_priority_fee_per_gas: self.gas_tip_cap,
            max_fee_per_gas: self.gas_fee_cap,
            gas_limit: self.gas_limit,
            to,
            value: self.value,
            input: self.data.clone(),
            access_list: Default::default(),
            blob_versioned_hashes,
            max_fee_per_blob_gas: self.blob_gas_fee_cap,
        };

        let signature = signer.sign_transaction(&mut tx).await?;
        let envelope: TxEnvelope = tx.into_signed(signature).into();

        let tx = TransactionWithBlobData::new(envelope, wrap);
        tx.validate()?;

        debug!(
            tx_hash = %tx.hash(),
            nonce,
            first_blob = %self.blob_id,
            blob_count = self.blob_count,
            "Created blob transaction"
        );
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy_consensus::Transaction;
    use cobalt_blob_engine::CKzgBackend;

    use super::*;
    use crate::accounts::TestAccounts;

    fn engine() -> CommitmentEngine {
        CommitmentEngine::new(Arc::new(CKzgBackend::ethereum()))
    }

    #[tokio::test]
    async fn creates_signed_blob_transaction() {
        let engine = engine();
        let accounts = TestAccounts::standard(1).unwrap();
        let creator = BlobTransactionCreator::new(Address::repeat_byte(0x11))
            .with_blobs(BlobId(5), 2);

        let tx = creator.make_transaction(&engine, accounts.vault(), 3, 1337).await.unwrap();

        assert!(tx.tx.is_eip4844());
        assert_eq!(tx.nonce(), 3);
        assert_eq!(tx.sender().unwrap(), accounts.vault().address());
        assert_eq!(tx.blob_data.len(), 2);
        assert!(BlobId(5).verify(&tx.blob_data.blobs[0]));
        assert!(BlobId(6).verify(&tx.blob_data.blobs[1]));
        assert_eq!(tx.versioned_hashes(), tx.blob_data.versioned_hashes(1).as_slice());
        assert_eq!(tx.tx.max_fee_per_blob_gas(), Some(DEFAULT_BLOB_GAS_FEE_CAP));
    }

    #[tokio::test]
    async fn missing_recipient_is_an_error() {
        let engine = engine();
        let accounts = TestAccounts::standard(1).unwrap();
        let err = BlobTransactionCreator::default()
            .make_transaction(&engine, accounts.vault(), 0, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::MissingRecipient));
    }

    #[tokio::test]
    async fn custom_hash_versions_apply_per_index() {
        let engine = engine();
        let accounts = TestAccounts::standard(1).unwrap();
        let tx = BlobTransactionCreator::new(Address::repeat_byte(0x22))
            .with_blobs(BlobId(1), 2)
            .with_hash_versions(vec![0x00])
            .make_transaction(&engine, accounts.vault(), 0, 1)
            .await
            .unwrap();

        assert_eq!(tx.versioned_hashes()[0][0], 0x00);
        assert_eq!(tx.versioned_hashes()[1][0], BLOB_COMMITMENT_VERSION_KZG);
    }
}
