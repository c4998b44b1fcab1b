//! Cross-validation of built payloads against the harness' own records.

use std::sync::Arc;

use alloy_consensus::{Transaction, transaction::SignerRecoverable};
use cobalt_blob_engine::BlobId;
use cobalt_execution::{ExecutionClient, engine_api::capabilities::ETH_GET_TRANSACTION_RECEIPT};
use cobalt_txpool::TestBlobTxPool;
use cobalt_types::{
    BlobTypeError,
    aliases::VersionedHash,
    blob::{Blob, BlobsBundle, KzgCommitment, KzgProof},
    constants::{BLOB_COMMITMENT_VERSION_KZG, GAS_PER_BLOB},
    fees::{blob_gas_price, calc_excess_blob_gas},
    fork::ForkConfig,
    payload::ExecutableData,
    transaction::TransactionWithBlobData,
};
use tracing::debug;

use crate::{context::BlobTestContext, error::StepError};

/// One blob of a payload with everything the harness recorded for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobWrapEntry {
    pub versioned_hash: VersionedHash,
    pub commitment: KzgCommitment,
    pub blob: Blob,
    pub proof: KzgProof,
}

/// Finds the pool record of every blob transaction in `payload`.
///
/// Returns the transactions in inclusion order and their blobs flattened in
/// the same order, which is the order the bundle must follow. A blob
/// transaction the pool never saw is a harness failure, not a client one.
pub fn blob_data_in_payload(
    pool: &TestBlobTxPool,
    payload: &ExecutableData,
) -> Result<(Vec<Arc<TransactionWithBlobData>>, Vec<BlobWrapEntry>), StepError> {
    let mut txs = Vec::new();
    let mut entries = Vec::new();

    for (index, tx) in payload.decode_transactions()?.into_iter().enumerate() {
        if !tx.is_eip4844() {
            continue;
        }

        let tx_hash = *tx.tx_hash();
        let sender = tx.recover_signer().map_err(|e| BlobTypeError::SenderRecovery {
            tx_hash,
            reason: e.to_string(),
        })?;
        debug!(index, %sender, nonce = tx.nonce(), "Blob transaction in payload");

        let recorded = pool.get(&tx_hash).ok_or(StepError::UntrackedTransaction { tx_hash })?;
        recorded.validate()?;

        let body_hashes = tx.blob_versioned_hashes().unwrap_or_default();
        let wrap = &recorded.blob_data;
        if body_hashes.len() != wrap.len() {
            return Err(BlobTypeError::WrapDataMismatch {
                tx_hash,
                wrap_len: wrap.len(),
                hashes_len: body_hashes.len(),
            }
            .into());
        }
        for (i, (body_hash, commitment)) in body_hashes.iter().zip(&wrap.commitments).enumerate() {
            if *body_hash != commitment.versioned_hash(BLOB_COMMITMENT_VERSION_KZG) {
                return Err(StepError::VersionedHashMismatch { tx_hash, index: i });
            }
        }

        for (i, versioned_hash) in body_hashes.iter().enumerate() {
            entries.push(BlobWrapEntry {
                versioned_hash: *versioned_hash,
                commitment: wrap.commitments[i],
                blob: wrap.blobs[i].clone(),
                proof: wrap.proofs[i],
            });
        }
        txs.push(recorded);
    }

    Ok((txs, entries))
}

/// Checks the bundle returned with a payload against the pool's records.
///
/// The bundle must hold exactly `expected_count` blobs, match the payload's
/// blobs index for index, and contain each of `expected_blobs` somewhere.
pub fn verify_blob_bundle(
    expected_count: u64,
    expected_blobs: &[BlobId],
    entries: &[BlobWrapEntry],
    bundle: &BlobsBundle,
) -> Result<(), StepError> {
    let (blobs, commitments, proofs) =
        (bundle.blobs.len(), bundle.commitments.len(), bundle.proofs.len());
    if blobs != commitments || blobs != proofs {
        return Err(StepError::BundleLength { blobs, commitments, proofs });
    }
    if blobs as u64 != expected_count {
        return Err(StepError::BundleBlobCount { expected: expected_count, actual: blobs });
    }
    if entries.len() != blobs {
        return Err(StepError::BundlePoolCount { expected: entries.len(), actual: blobs });
    }

    for (index, entry) in entries.iter().enumerate() {
        if bundle.commitments[index] != entry.commitment {
            return Err(StepError::BundleMismatch { what: "KZG", index });
        }
        if bundle.blobs[index] != entry.blob {
            return Err(StepError::BundleMismatch { what: "blob", index });
        }
        if bundle.proofs[index] != entry.proof {
            return Err(StepError::BundleMismatch { what: "proof", index });
        }
    }

    for id in expected_blobs {
        let mut found = false;
        for entry in entries {
            if id.verify_blob(Some(&entry.blob))? {
                found = true;
                break;
            }
        }
        if !found {
            return Err(StepError::ExpectedBlobNotFound { id: *id });
        }
    }

    Ok(())
}

/// Checks the blob gas header fields of `payload` and the receipts of its
/// blob transactions.
///
/// The expected excess blob gas follows from `previous`; a missing previous
/// payload counts as zero excess and zero usage.
pub async fn verify_payload(
    ctx: &BlobTestContext,
    client: &ExecutionClient,
    fork_config: &ForkConfig,
    expected_count: u64,
    blob_txs: &[Arc<TransactionWithBlobData>],
    payload: &ExecutableData,
    previous: Option<&ExecutableData>,
) -> Result<(), StepError> {
    let parent_excess = previous.and_then(|p| p.excess_blob_gas).unwrap_or_default();
    let parent_used = previous.and_then(|p| p.blob_gas_used).unwrap_or_default();
    let expected_excess = calc_excess_blob_gas(parent_excess, parent_used);

    if !fork_config.is_cancun(payload.timestamp) {
        if payload.excess_blob_gas.is_some() {
            return Err(StepError::UnexpectedBlobGasField { field: "excessBlobGas" });
        }
        if payload.blob_gas_used.is_some() {
            return Err(StepError::UnexpectedBlobGasField { field: "blobGasUsed" });
        }
        return Ok(());
    }

    let excess = payload
        .excess_blob_gas
        .ok_or(StepError::MissingBlobGasField { field: "excessBlobGas" })?;
    if payload.blob_gas_used.is_none() {
        return Err(StepError::MissingBlobGasField { field: "blobGasUsed" });
    }
    if excess != expected_excess {
        return Err(StepError::ExcessBlobGasMismatch { expected: expected_excess, actual: excess });
    }

    let expected_price = blob_gas_price(expected_excess);
    let mut total_blobs = 0u64;
    for tx in blob_txs {
        let tx_hash = tx.hash();
        let blob_count = tx.versioned_hashes().len() as u64;
        total_blobs += blob_count;

        let receipt = ctx
            .rpc(ETH_GET_TRANSACTION_RECEIPT, client.eth().transaction_receipt(tx_hash))
            .await?
            .ok_or(StepError::MissingReceipt { tx_hash })?;

        let expected_used = blob_count * GAS_PER_BLOB;
        if receipt.blob_gas_used != Some(expected_used) {
            return Err(StepError::ReceiptMismatch {
                tx_hash,
                field: "blobGasUsed",
                expected: expected_used.to_string(),
                actual: format!("{:?}", receipt.blob_gas_used),
            });
        }
        if receipt.blob_gas_price != Some(expected_price) {
            return Err(StepError::ReceiptMismatch {
                tx_hash,
                field: "blobGasPrice",
                expected: expected_price.to_string(),
                actual: format!("{:?}", receipt.blob_gas_price),
            });
        }
    }

    if total_blobs != expected_count {
        return Err(StepError::IncludedBlobCount { expected: expected_count, actual: total_blobs });
    }

    Ok(())
}
