use std::time::Duration;

use alloy_primitives::B256;
use cobalt_blob_engine::{BlobEngineError, BlobId, BlobSynthError};
use cobalt_execution::ExecutionError;
use cobalt_txpool::PoolError;
use cobalt_types::BlobTypeError;
use color_eyre::eyre;
use thiserror::Error;

/// Why a test step failed.
///
/// Consistency violations name the index or identifier involved; expectation
/// failures carry both the expected and the actual value.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{call} timed out after {timeout:?}")]
    Timeout { call: &'static str, timeout: Duration },

    #[error("{call} cancelled")]
    Cancelled { call: &'static str },

    #[error("{call} failed: {report:#}")]
    Rpc { call: &'static str, report: eyre::Report },

    #[error("block production failed: {0:#}")]
    Producer(eyre::Report),

    #[error("failed to start client: {0:#}")]
    ClientStart(eyre::Report),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    BlobEngine(#[from] BlobEngineError),

    #[error(transparent)]
    BlobSynth(#[from] BlobSynthError),

    #[error(transparent)]
    Malformed(#[from] BlobTypeError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("invalid client index {index} ({count} clients)")]
    InvalidClientIndex { index: usize, count: usize },

    #[error("invalid account index {index} ({count} accounts)")]
    InvalidAccountIndex { index: usize, count: usize },

    #[error("no payload available")]
    NoPayloadAvailable,

    #[error("no blobs bundle returned with the payload")]
    MissingBlobsBundle,

    #[error("could not find transaction {tx_hash} in the pool")]
    UntrackedTransaction { tx_hash: B256 },

    #[error("versioned hash mismatch at index {index} of transaction {tx_hash}")]
    VersionedHashMismatch { tx_hash: B256, index: usize },

    #[error(
        "unexpected length in blob bundle: {blobs} blobs, {proofs} proofs, {commitments} commitments"
    )]
    BundleLength { blobs: usize, commitments: usize, proofs: usize },

    #[error("expected {expected} blob, got {actual}")]
    BundleBlobCount { expected: u64, actual: usize },

    #[error("expected {expected} blobs in the bundle, got {actual}")]
    BundlePoolCount { expected: usize, actual: usize },

    #[error("{what} mismatch at index {index} of the bundle")]
    BundleMismatch { what: &'static str, index: usize },

    #[error("could not find expected blob {id}")]
    ExpectedBlobNotFound { id: BlobId },

    #[error("payload contains nil {field}")]
    MissingBlobGasField { field: &'static str },

    #[error("payload contains non-nil {field} pre-fork")]
    UnexpectedBlobGasField { field: &'static str },

    #[error("payload contains incorrect excessBlobGas: want {expected:#x}, have {actual:#x}")]
    ExcessBlobGasMismatch { expected: u64, actual: u64 },

    #[error("expected {expected} blobs in transactions, got {actual}")]
    IncludedBlobCount { expected: u64, actual: u64 },

    #[error("no receipt for transaction {tx_hash}")]
    MissingReceipt { tx_hash: B256 },

    #[error("receipt of {tx_hash}: expected {field} {expected}, got {actual}")]
    ReceiptMismatch { tx_hash: B256, field: &'static str, expected: String, actual: String },

    #[error("{call}: expected {expected}, got {actual}")]
    Expectation { call: &'static str, expected: String, actual: String },

    #[error("transaction {tx_hash} not found on the node")]
    TransactionNotVisible { tx_hash: B256 },

    #[error("transaction {tx_hash} on the node differs in {field}")]
    TransactionMismatch { tx_hash: B256, field: &'static str },

    #[error("error {stage} (payload {payload}/{count}): {source}")]
    Cycle {
        stage: &'static str,
        payload: u64,
        count: u64,
        #[source]
        source: Box<StepError>,
    },

    #[error("step {index} ({description}) failed: {source}")]
    Step {
        index: usize,
        description: String,
        #[source]
        source: Box<StepError>,
    },

    #[error("parallel step task failed: {0}")]
    TaskFailed(String),
}

impl StepError {
    pub(crate) fn in_cycle(self, stage: &'static str, payload: u64, count: u64) -> Self {
        Self::Cycle { stage, payload: payload + 1, count, source: Box::new(self) }
    }

    /// The innermost error, looking through step and cycle wrappers.
    pub fn root(&self) -> &StepError {
        match self {
            Self::Cycle { source, .. } | Self::Step { source, .. } => source.root(),
            other => other,
        }
    }
}
