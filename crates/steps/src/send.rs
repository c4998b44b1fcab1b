use std::sync::Arc;

use alloy_consensus::Transaction;
use alloy_primitives::Address;
use async_trait::async_trait;
use cobalt_execution::{
    ExecutionClient,
    engine_api::capabilities::{ETH_GET_TRANSACTION_BY_HASH, ETH_SEND_RAW_TRANSACTION},
};
use cobalt_txpool::BlobTransactionCreator;
use cobalt_types::{
    constants::{BLOB_TX_GAS_LIMIT, DATAHASH_START_ADDRESS},
    transaction::TransactionWithBlobData,
};
use tracing::{info, warn};

use crate::{context::BlobTestContext, error::StepError, step::TestStep};

/// Sends blob transactions through one client.
///
/// Every transaction draws fresh blob identifiers from the pool. With
/// `replace_transactions` each one reuses the sender's last nonce instead
/// of taking a new one, so it competes with the transaction already pooled.
#[derive(Clone, Debug, Default)]
pub struct SendBlobTransactions {
    pub transaction_count: u64,
    /// 0 sends one blob per transaction.
    pub blobs_per_transaction: u64,
    pub blob_gas_fee_cap: Option<u128>,
    pub gas_fee_cap: Option<u128>,
    pub gas_tip_cap: Option<u128>,
    pub replace_transactions: bool,
    pub skip_verification_from_node: bool,
    pub account_index: usize,
    pub client_index: usize,
}

impl SendBlobTransactions {
    pub fn blobs_per_transaction(&self) -> u64 {
        self.blobs_per_transaction.max(1)
    }

    fn creator(&self) -> BlobTransactionCreator {
        let to = Address::left_padding_from(&DATAHASH_START_ADDRESS.to_be_bytes());
        let mut creator = BlobTransactionCreator::new(to);
        creator.gas_limit = BLOB_TX_GAS_LIMIT;
        if let Some(fee) = self.gas_fee_cap {
            creator.gas_fee_cap = fee;
        }
        if let Some(tip) = self.gas_tip_cap {
            creator.gas_tip_cap = tip;
        }
        if let Some(blob_fee) = self.blob_gas_fee_cap {
            creator.blob_gas_fee_cap = blob_fee;
        }
        creator
    }
}

#[async_trait]
impl TestStep for SendBlobTransactions {
    async fn execute(&self, ctx: &Arc<BlobTestContext>) -> Result<(), StepError> {
        let client = ctx.client(self.client_index)?;
        let signer = ctx.accounts.get(self.account_index).ok_or(StepError::InvalidAccountIndex {
            index: self.account_index,
            count: ctx.accounts.len(),
        })?;
        let sender = signer.address();
        let blobs_per_tx = self.blobs_per_transaction();

        for _ in 0..self.transaction_count {
            let nonce = if self.replace_transactions {
                ctx.pool.last_nonce(sender)?
            } else {
                ctx.pool.next_nonce(sender)
            };
            let first_blob = ctx.pool.reserve_blob_ids(blobs_per_tx)?;

            let tx = self
                .creator()
                .with_blobs(first_blob, blobs_per_tx)
                .make_transaction(&ctx.engine, signer, nonce, ctx.chain_id)
                .await?;

            let sent = ctx.rpc(ETH_SEND_RAW_TRANSACTION, client.eth().send_transaction(&tx)).await;
            // A rejected transaction never reached the mempool, so its nonce
            // is free again.
            if let Err(StepError::Rpc { .. }) = &sent
                && !self.replace_transactions
                && !ctx.pool.release_nonce(sender, nonce)
            {
                warn!(%sender, nonce, "Rejected transaction leaves a nonce gap");
            }
            let tx_hash = sent?;
            if tx_hash != tx.hash() {
                return Err(StepError::TransactionMismatch { tx_hash: tx.hash(), field: "hash" });
            }

            if !self.skip_verification_from_node {
                verify_transaction_from_node(ctx, &client, &tx).await?;
            }

            ctx.pool.add_transaction(tx)?;
            info!(
                %tx_hash,
                %sender,
                nonce,
                first_blob = %first_blob,
                blobs = blobs_per_tx,
                client = client.name(),
                "Sent blob transaction"
            );
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "SendBlobTransactions: {} Transactions, {} blobs each, {} max data gas fee",
            self.transaction_count,
            self.blobs_per_transaction(),
            self.blob_gas_fee_cap.map_or_else(|| "default".to_string(), |fee| fee.to_string())
        )
    }
}

/// Fetches `tx` back from the node's pool and compares it with what was sent.
pub async fn verify_transaction_from_node(
    ctx: &BlobTestContext,
    client: &ExecutionClient,
    tx: &TransactionWithBlobData,
) -> Result<(), StepError> {
    let tx_hash = tx.hash();
    let returned = ctx
        .rpc(ETH_GET_TRANSACTION_BY_HASH, client.eth().pooled_transaction(tx_hash))
        .await?
        .ok_or(StepError::TransactionNotVisible { tx_hash })?;

    if *returned.tx_hash() != tx_hash {
        return Err(StepError::TransactionMismatch { tx_hash, field: "hash" });
    }
    if returned.nonce() != tx.nonce() {
        return Err(StepError::TransactionMismatch { tx_hash, field: "nonce" });
    }
    if returned.blob_versioned_hashes().unwrap_or_default() != tx.versioned_hashes() {
        return Err(StepError::TransactionMismatch { tx_hash, field: "blobVersionedHashes" });
    }
    Ok(())
}
