//! Commitment engine.
//!
//! Turns an ordered list of blobs into the parallel commitment, proof and
//! versioned-hash lists a blob transaction carries. The capability that does
//! the arithmetic is injected once at construction and shared read-only.

use std::sync::Arc;

use cobalt_types::{
    aliases::VersionedHash,
    blob::{Blob, BlobTxWrapData, BlobsBundle, KzgCommitment, KzgProof},
    constants::BLOB_COMMITMENT_VERSION_KZG,
};
use tracing::{debug, info};

use crate::{
    error::BlobEngineError,
    kzg::KzgBackend,
    synth::{BlobId, blob_range},
};

/// Commitments, proofs and versioned hashes for a list of blobs, index-aligned
/// with the input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommittedBlobs {
    /// One commitment per blob.
    pub commitments: Vec<KzgCommitment>,
    /// One proof per blob.
    pub proofs: Vec<KzgProof>,
    /// Versioned hashes under [`BLOB_COMMITMENT_VERSION_KZG`].
    pub versioned_hashes: Vec<VersionedHash>,
}

impl CommittedBlobs {
    /// Number of committed blobs.
    pub fn len(&self) -> usize {
        self.commitments.len()
    }

    /// Whether no blob was committed.
    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }
}

/// Computes commitment data over an injected [`KzgBackend`].
#[derive(Clone, Debug)]
pub struct CommitmentEngine {
    kzg: Arc<dyn KzgBackend>,
}

impl CommitmentEngine {
    /// Creates an engine sharing `kzg`.
    pub fn new(kzg: Arc<dyn KzgBackend>) -> Self {
        Self { kzg }
    }

    /// The underlying capability.
    pub fn backend(&self) -> &Arc<dyn KzgBackend> {
        &self.kzg
    }

    /// Commits to every blob in order.
    ///
    /// Fails atomically: the first blob whose commitment or proof cannot be
    /// computed aborts the whole call and no partial lists are returned.
    pub fn commit(&self, blobs: &[Blob]) -> Result<CommittedBlobs, BlobEngineError> {
        let mut out = CommittedBlobs {
            commitments: Vec::with_capacity(blobs.len()),
            proofs: Vec::with_capacity(blobs.len()),
            versioned_hashes: Vec::with_capacity(blobs.len()),
        };

        for (index, blob) in blobs.iter().enumerate() {
            let commitment = self
                .kzg
                .blob_to_commitment(blob)
                .map_err(|source| BlobEngineError::Commitment { index, source })?;
            let proof = self
                .kzg
                .compute_proof(blob, &commitment)
                .map_err(|source| BlobEngineError::Proof { index, source })?;

            out.versioned_hashes.push(commitment.versioned_hash(BLOB_COMMITMENT_VERSION_KZG));
            out.commitments.push(commitment);
            out.proofs.push(proof);
        }

        debug!(count = blobs.len(), "Computed blob commitments");
        Ok(out)
    }

    /// Synthesizes `count` blobs starting at `start` and returns their wrap
    /// data together with the matching versioned hashes.
    pub fn wrap_data(
        &self,
        start: BlobId,
        count: u64,
    ) -> Result<(BlobTxWrapData, Vec<VersionedHash>), BlobEngineError> {
        let blobs: Vec<Blob> = blob_range(start, count).into_iter().map(BlobId::fill).collect();
        let committed = self.commit(&blobs)?;
        let hashes = committed.versioned_hashes;
        let wrap = BlobTxWrapData::new(blobs, committed.commitments, committed.proofs);
        wrap.validate()?;
        Ok((wrap, hashes))
    }

    /// Versioned hash of the synthetic blob `id`, with an explicit version byte.
    pub fn versioned_hash(
        &self,
        id: BlobId,
        version: u8,
    ) -> Result<VersionedHash, BlobEngineError> {
        let commitment = self
            .kzg
            .blob_to_commitment(&id.fill())
            .map_err(|source| BlobEngineError::Commitment { index: 0, source })?;
        Ok(commitment.versioned_hash(version))
    }

    /// Verifies every proof of a bundle against its blob and commitment.
    pub fn verify_proofs(&self, bundle: &BlobsBundle) -> Result<(), BlobEngineError> {
        bundle.validate()?;

        let items = bundle.blobs.iter().zip(&bundle.commitments).zip(&bundle.proofs);
        for (index, ((blob, commitment), proof)) in items.enumerate() {
            let valid = self
                .kzg
                .verify_proof(blob, commitment, proof)
                .map_err(|source| BlobEngineError::VerificationFailed { index, source })?;
            if !valid {
                return Err(BlobEngineError::InvalidProofValue { index });
            }
        }

        info!(count = bundle.len(), "Verified blobs bundle proofs");
        Ok(())
    }
}
