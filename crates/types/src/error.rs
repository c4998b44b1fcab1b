use thiserror::Error;

use crate::aliases::B256;

/// Errors raised while decoding or validating the shared data types.
#[derive(Debug, Error)]
pub enum BlobTypeError {
    /// A hex-encoded field did not start with `0x`.
    #[error("{field}: missing 0x prefix")]
    MissingPrefix {
        /// Name of the field being decoded.
        field: &'static str,
    },

    /// A fixed-size field had the wrong number of bytes or hex characters.
    #[error("{field}: invalid length, expected {expected}, got {actual}")]
    InvalidLength {
        /// Name of the field being decoded.
        field: &'static str,
        /// Expected length.
        expected: usize,
        /// Length found in the input.
        actual: usize,
    },

    /// A hex-encoded field contained non-hex characters.
    #[error("{field}: invalid hex: {source}")]
    InvalidHex {
        /// Name of the field being decoded.
        field: &'static str,
        #[source]
        /// Underlying decoder error.
        source: hex::FromHexError,
    },

    /// The parallel blob/commitment/proof arrays disagree on length.
    #[error(
        "blob data length mismatch: blobs={blobs}, commitments={commitments}, proofs={proofs}"
    )]
    LengthMismatch {
        /// Number of blobs.
        blobs: usize,
        /// Number of commitments.
        commitments: usize,
        /// Number of proofs.
        proofs: usize,
    },

    /// The wrap data does not have one entry per versioned hash of its transaction.
    #[error(
        "wrap data of transaction {tx_hash} carries {wrap_len} blobs but the transaction lists {hashes_len} versioned hashes"
    )]
    WrapDataMismatch {
        /// Hash of the offending transaction.
        tx_hash: B256,
        /// Number of blobs in the wrap data.
        wrap_len: usize,
        /// Number of versioned hashes in the transaction body.
        hashes_len: usize,
    },

    /// More blobs than a single block may carry.
    #[error("too many blobs: {count} exceeds maximum {max}")]
    TooManyBlobs {
        /// Number of blobs found.
        count: usize,
        /// Protocol maximum.
        max: usize,
    },

    /// A payload field that the target Engine API version cannot carry.
    #[error("payload field `{field}` is not supported by ExecutionPayloadV{version}")]
    UnsupportedPayloadField {
        /// Target payload version.
        version: u8,
        /// Name of the field.
        field: &'static str,
    },

    /// A payload field that the target Engine API version requires.
    #[error("payload field `{field}` is required by ExecutionPayloadV{version}")]
    MissingPayloadField {
        /// Target payload version.
        version: u8,
        /// Name of the field.
        field: &'static str,
    },

    /// A transaction in a payload could not be decoded.
    #[error("transaction {index}: undecodable bytes: {reason}")]
    TransactionDecode {
        /// Position of the transaction in the payload.
        index: usize,
        /// Decoder message.
        reason: String,
    },

    /// The sender could not be recovered from the transaction signature.
    #[error("transaction {tx_hash}: sender recovery failed: {reason}")]
    SenderRecovery {
        /// Hash of the transaction.
        tx_hash: B256,
        /// Recovery failure message.
        reason: String,
    },

    /// Fork activation timestamps are inconsistent.
    #[error("invalid fork configuration: {0}")]
    InvalidForkConfig(String),
}
