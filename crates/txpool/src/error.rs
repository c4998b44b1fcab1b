use alloy_primitives::Address;
use alloy_signer_local::LocalSignerError;
use cobalt_blob_engine::{BlobEngineError, BlobId};
use cobalt_types::BlobTypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("blob transaction has no recipient")]
    MissingRecipient,

    #[error("failed to derive test account {index}: {source}")]
    AccountDerivation {
        index: u32,
        #[source]
        source: LocalSignerError,
    },

    #[error("at least one test account is required")]
    NoAccounts,

    #[error("failed to compute blob data: {0}")]
    BlobData(#[from] BlobEngineError),

    #[error("failed to sign blob transaction: {0}")]
    Signing(#[from] alloy_signer::Error),

    #[error("invalid blob transaction: {0}")]
    InvalidTransaction(#[from] BlobTypeError),

    #[error("account {address} has not sent any transaction to replace")]
    NoPreviousNonce { address: Address },

    #[error("cannot reserve {count} blob ids from {first} without wrapping")]
    BlobIdsExhausted { first: BlobId, count: u64 },
}
