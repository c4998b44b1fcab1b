//! Error types for blob synthesis and commitment computation
use thiserror::Error;

use crate::synth::BlobId;

/// Errors reported when checking bytes against a synthetic blob.
#[derive(Debug, Error)]
pub enum BlobSynthError {
    /// There was no blob to compare against.
    #[error("no blob supplied for verification of blob id {id}")]
    MissingBlob {
        /// Identifier the blob was checked against.
        id: BlobId,
    },

    /// The candidate bytes are not blob-sized.
    #[error("blob id {id}: candidate has {actual} bytes")]
    InvalidLength {
        /// Identifier the blob was checked against.
        id: BlobId,
        /// Size of the candidate.
        actual: usize,
    },
}

/// Failures of the commitment capability.
#[derive(Debug, Error)]
pub enum KzgError {
    /// Failed to load the trusted setup
    #[error("Failed to load trusted setup: {0}")]
    TrustedSetupLoad(String),

    /// The blob bytes were rejected (e.g. a field element above the modulus)
    #[error("Invalid blob data: {0}")]
    InvalidBlob(String),

    /// The commitment bytes were rejected
    #[error("Invalid KZG commitment: {0}")]
    InvalidCommitment(String),

    /// The proof bytes were rejected
    #[error("Invalid KZG proof: {0}")]
    InvalidProof(String),

    /// The computation itself failed
    #[error("KZG computation failed: {0}")]
    Computation(String),
}

/// Errors that can occur while committing to a list of blobs
#[derive(Debug, Error)]
pub enum BlobEngineError {
    /// Commitment computation failed for one blob of the list
    #[error("commitment for blob at index {index} failed: {source}")]
    Commitment {
        /// Position of the blob in the input list.
        index: usize,
        #[source]
        /// Underlying capability error.
        source: KzgError,
    },

    /// Proof computation failed for one blob of the list
    #[error("proof for blob at index {index} failed: {source}")]
    Proof {
        /// Position of the blob in the input list.
        index: usize,
        #[source]
        /// Underlying capability error.
        source: KzgError,
    },

    /// A proof did not verify against its blob and commitment
    #[error("KZG proof is invalid for blob at index {index}")]
    InvalidProofValue {
        /// Position of the blob in the bundle.
        index: usize,
    },

    /// Verification could not be carried out
    #[error("verification of blob at index {index} failed: {source}")]
    VerificationFailed {
        /// Position of the blob in the bundle.
        index: usize,
        #[source]
        /// Underlying capability error.
        source: KzgError,
    },

    /// The parallel arrays handed in for verification disagree on length
    #[error("blob data length mismatch: {0}")]
    Malformed(#[from] cobalt_types::BlobTypeError),
}
