//! Hash-based stand-in for the KZG capability.

use cobalt_blob_engine::{KzgBackend, KzgError};
use cobalt_types::blob::{Blob, KzgCommitment, KzgProof};
use sha2::{Digest, Sha256};

/// Deterministic, cheap commitment scheme for tests that do not care about
/// real cryptography.
///
/// The commitment is derived from the blob bytes and the proof from the
/// commitment, so any mix-up between blobs, commitments and proofs is still
/// detected by [`KzgBackend::verify_proof`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FakeKzg;

fn widen(domain: &[u8], input: &[u8]) -> [u8; 48] {
    let first = Sha256::new().chain_update(domain).chain_update(input).finalize();
    let second = Sha256::new().chain_update(first).finalize();
    let mut out = [0u8; 48];
    out[..32].copy_from_slice(&first);
    out[32..].copy_from_slice(&second[..16]);
    out
}

impl KzgBackend for FakeKzg {
    fn blob_to_commitment(&self, blob: &Blob) -> Result<KzgCommitment, KzgError> {
        Ok(KzgCommitment::new(widen(b"commitment", blob.data())))
    }

    fn compute_proof(
        &self,
        blob: &Blob,
        commitment: &KzgCommitment,
    ) -> Result<KzgProof, KzgError> {
        if self.blob_to_commitment(blob)? != *commitment {
            return Err(KzgError::InvalidCommitment("commitment does not match blob".into()));
        }
        Ok(KzgProof::new(widen(b"proof", &commitment.0)))
    }

    fn verify_proof(
        &self,
        blob: &Blob,
        commitment: &KzgCommitment,
        proof: &KzgProof,
    ) -> Result<bool, KzgError> {
        Ok(self.blob_to_commitment(blob)? == *commitment
            && KzgProof::new(widen(b"proof", &commitment.0)) == *proof)
    }
}

#[cfg(test)]
mod tests {
    use cobalt_blob_engine::BlobId;

    use super::*;

    #[test]
    fn proofs_bind_blob_and_commitment() {
        let kzg = FakeKzg;
        let (a, b) = (BlobId(1).fill(), BlobId(2).fill());
        let ca = kzg.blob_to_commitment(&a).unwrap();
        let pa = kzg.compute_proof(&a, &ca).unwrap();

        assert!(kzg.verify_proof(&a, &ca, &pa).unwrap());
        assert!(!kzg.verify_proof(&b, &ca, &pa).unwrap());
        assert!(kzg.compute_proof(&b, &ca).is_err());
    }
}
