//! Transactions as the node reports them back: hashes, nonces and blob
//! hash lists must match what was sent.

mod common;

use std::sync::Arc;

use alloy_consensus::Signed;
use alloy_primitives::B256;
use async_trait::async_trait;
use cobalt_execution::{EthRpc, ExecutionClient, ExecutionError, ReceiptSummary};
use cobalt_steps::{SendBlobTransactions, StepError, TestSequence, TestStep};
use cobalt_test_support::{Harness, MockExecutionClient};
use cobalt_txpool::PoolError;
use cobalt_types::{
    aliases::{TxEnvelope, TxHash},
    transaction::TransactionWithBlobData,
};
use color_eyre::eyre;
use common::{cancun_harness, payloads, send};

#[derive(Clone, Copy, Debug)]
enum Alteration {
    /// `eth_sendRawTransaction` answers with a foreign hash.
    SendHash,
    /// The pooled transaction claims a foreign hash.
    PooledHash,
    Nonce,
    BlobHashes,
    /// Every submission is refused.
    Reject,
}

/// Forwards to the in-memory node, altering one aspect of its answers.
struct AlteredNode {
    node: Arc<MockExecutionClient>,
    alteration: Alteration,
}

impl AlteredNode {
    fn alter(&self, tx: TxEnvelope) -> TxEnvelope {
        let Some(signed) = tx.as_eip4844() else {
            return tx;
        };
        let signature = *signed.signature();
        let mut hash = *signed.hash();
        let mut body = signed.tx().tx().clone();

        match self.alteration {
            Alteration::PooledHash => hash = B256::repeat_byte(0xee),
            Alteration::Nonce => body.nonce += 1,
            Alteration::BlobHashes => body.blob_versioned_hashes.reverse(),
            Alteration::SendHash | Alteration::Reject => return tx,
        }
        Signed::new_unchecked(body, signature, hash).into()
    }
}

#[async_trait]
impl EthRpc for AlteredNode {
    async fn send_transaction(&self, tx: &TransactionWithBlobData) -> eyre::Result<TxHash> {
        match self.alteration {
            Alteration::Reject => Err(ExecutionError::json_rpc(-32000, "refused").into()),
            Alteration::SendHash => {
                self.node.send_transaction(tx).await?;
                Ok(B256::repeat_byte(0xee))
            }
            _ => self.node.send_transaction(tx).await,
        }
    }

    async fn transaction_receipt(&self, hash: TxHash) -> eyre::Result<Option<ReceiptSummary>> {
        self.node.transaction_receipt(hash).await
    }

    async fn pooled_transaction(&self, hash: TxHash) -> eyre::Result<Option<TxEnvelope>> {
        Ok(self.node.pooled_transaction(hash).await?.map(|tx| self.alter(tx)))
    }
}

/// Registers client 1: client 0's node behind an altering RPC.
fn add_altered_client(h: &Harness, alteration: Alteration) -> usize {
    let eth = Arc::new(AlteredNode { node: h.client.clone(), alteration });
    h.ctx.add_client(ExecutionClient::new("altered", h.client.clone(), eth))
}

async fn send_through(h: &Harness, client_index: usize, blobs: u64) -> StepError {
    SendBlobTransactions { client_index, ..send(1, blobs) }.execute(&h.ctx).await.unwrap_err()
}

#[tokio::test]
async fn foreign_hash_from_send_is_detected() {
    let h = cancun_harness();
    let client = add_altered_client(&h, Alteration::SendHash);

    let err = send_through(&h, client, 1).await;
    assert!(matches!(err, StepError::TransactionMismatch { field: "hash", .. }));
    assert_eq!(h.ctx.pool.transaction_count(), 0);
}

#[tokio::test]
async fn pooled_transaction_with_foreign_hash_is_detected() {
    let h = cancun_harness();
    let client = add_altered_client(&h, Alteration::PooledHash);

    let err = send_through(&h, client, 1).await;
    assert!(matches!(err, StepError::TransactionMismatch { field: "hash", .. }));
}

#[tokio::test]
async fn pooled_transaction_with_other_nonce_is_detected() {
    let h = cancun_harness();
    let client = add_altered_client(&h, Alteration::Nonce);

    let err = send_through(&h, client, 1).await;
    assert!(matches!(err, StepError::TransactionMismatch { field: "nonce", .. }));
}

#[tokio::test]
async fn pooled_transaction_with_reordered_blob_hashes_is_detected() {
    let h = cancun_harness();
    let client = add_altered_client(&h, Alteration::BlobHashes);

    let err = send_through(&h, client, 2).await;
    assert!(matches!(err, StepError::TransactionMismatch { field: "blobVersionedHashes", .. }));
}

#[tokio::test]
async fn rejected_send_frees_its_nonce() -> color_eyre::Result<()> {
    let h = cancun_harness();
    let client = add_altered_client(&h, Alteration::Reject);
    let sender = h.ctx.accounts.vault().address();

    let err = send_through(&h, client, 1).await;
    assert!(matches!(err, StepError::Rpc { call: "eth_sendRawTransaction", .. }));
    assert!(matches!(h.ctx.pool.last_nonce(sender), Err(PoolError::NoPreviousNonce { .. })));

    // The next transaction reuses nonce 0, so the node can include it.
    TestSequence::new().step(send(1, 1)).step(payloads(1)).run(&h.ctx).await?;
    Ok(())
}
