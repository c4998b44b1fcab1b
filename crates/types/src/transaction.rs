use alloy_consensus::{Transaction, transaction::SignerRecoverable};

use crate::{
    aliases::{Address, B256, TxEnvelope},
    blob::BlobTxWrapData,
    error::BlobTypeError,
};

/// A signed blob transaction together with the wrap data it was built from.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionWithBlobData {
    pub tx: TxEnvelope,
    pub blob_data: BlobTxWrapData,
}

impl TransactionWithBlobData {
    pub fn new(tx: TxEnvelope, blob_data: BlobTxWrapData) -> Self {
        Self { tx, blob_data }
    }

    pub fn hash(&self) -> B256 {
        *self.tx.tx_hash()
    }

    pub fn nonce(&self) -> u64 {
        self.tx.nonce()
    }

    /// The protocol-level blob hash list of the transaction body.
    pub fn versioned_hashes(&self) -> &[B256] {
        self.tx.blob_versioned_hashes().unwrap_or_default()
    }

    pub fn sender(&self) -> Result<Address, BlobTypeError> {
        self.tx.recover_signer().map_err(|e| BlobTypeError::SenderRecovery {
            tx_hash: self.hash(),
            reason: e.to_string(),
        })
    }

    /// Checks that blobs, commitments, proofs and the transaction's versioned
    /// hashes all have the same length.
    pub fn validate(&self) -> Result<(), BlobTypeError> {
        self.blob_data.validate()?;
        let hashes_len = self.versioned_hashes().len();
        if self.blob_data.len() != hashes_len {
            return Err(BlobTypeError::WrapDataMismatch {
                tx_hash: self.hash(),
                wrap_len: self.blob_data.len(),
                hashes_len,
            });
        }
        Ok(())
    }
}
