use async_trait::async_trait;
use color_eyre::eyre;
use cobalt_types::{
    aliases::{B256, TxEnvelope, TxHash},
    transaction::TransactionWithBlobData,
};

/// The fields of a transaction receipt the blob checks look at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub tx_hash: TxHash,
    pub block_hash: B256,
    pub block_number: u64,
    /// Absent for non-blob transactions.
    pub blob_gas_used: Option<u64>,
    /// Absent for non-blob transactions.
    pub blob_gas_price: Option<u128>,
}

/// The standard Ethereum JSON-RPC calls the harness needs besides the
/// Engine API.
#[async_trait]
pub trait EthRpc: Send + Sync {
    /// Corresponds to `eth_sendRawTransaction` with the network (wrapped)
    /// encoding, i.e. the transaction together with its blobs.
    async fn send_transaction(&self, tx: &TransactionWithBlobData) -> eyre::Result<TxHash>;

    /// Corresponds to `eth_getTransactionReceipt`.
    async fn transaction_receipt(&self, hash: TxHash) -> eyre::Result<Option<ReceiptSummary>>;

    /// Corresponds to `eth_getTransactionByHash` for a transaction still in
    /// the client's mempool.
    async fn pooled_transaction(&self, hash: TxHash) -> eyre::Result<Option<TxEnvelope>>;
}
