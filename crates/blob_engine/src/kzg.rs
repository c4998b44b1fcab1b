//! Commitment capability.
//!
//! The polynomial commitment scheme is opaque to the rest of the crate: all
//! it needs is "commit to this blob", "prove this blob against that
//! commitment" and "check a proof". [`KzgBackend`] is that seam and
//! [`CKzgBackend`] is the production implementation over `c-kzg`.
//!
//! Loading a trusted setup is expensive. Build one backend during run
//! bootstrap and share it behind an `Arc`; it is immutable afterwards.

use std::{fmt, path::Path, sync::Arc};

use c_kzg::{Blob as CKzgBlob, Bytes48, KzgSettings};
use cobalt_types::blob::{Blob, KzgCommitment, KzgProof};
use serde::Deserialize;

use crate::error::KzgError;

/// Number of bytes per G1 point
const BYTES_PER_G1_POINT: usize = 48;
/// Number of bytes per G2 point
const BYTES_PER_G2_POINT: usize = 96;

/// No fixed-base MSM precomputation; proving is not on a hot path here.
const NO_PRECOMPUTE: u64 = 0;

/// Opaque commitment/proof capability.
pub trait KzgBackend: Send + Sync + fmt::Debug {
    /// Computes the commitment to `blob`.
    fn blob_to_commitment(&self, blob: &Blob) -> Result<KzgCommitment, KzgError>;

    /// Computes the proof binding `blob` to `commitment`.
    fn compute_proof(&self, blob: &Blob, commitment: &KzgCommitment)
    -> Result<KzgProof, KzgError>;

    /// Checks `proof` for `blob` against `commitment`.
    fn verify_proof(
        &self,
        blob: &Blob,
        commitment: &KzgCommitment,
        proof: &KzgProof,
    ) -> Result<bool, KzgError>;
}

/// Wrapper over a BLS G1 point's byte representation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
struct G1Point(#[serde(with = "hex_serde")] [u8; BYTES_PER_G1_POINT]);

/// Wrapper over a BLS G2 point's byte representation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
struct G2Point(#[serde(with = "hex_serde")] [u8; BYTES_PER_G2_POINT]);

/// JSON trusted setup as published by the consensus specs.
#[derive(Debug, Clone, Deserialize)]
struct TrustedSetup {
    g1_monomial: Vec<G1Point>,
    g1_lagrange: Vec<G1Point>,
    g2_monomial: Vec<G2Point>,
}

impl TrustedSetup {
    fn into_settings(self) -> Result<KzgSettings, KzgError> {
        let g1_monomial: Vec<u8> = self.g1_monomial.iter().flat_map(|p| p.0).collect();
        let g1_lagrange: Vec<u8> = self.g1_lagrange.iter().flat_map(|p| p.0).collect();
        let g2_monomial: Vec<u8> = self.g2_monomial.iter().flat_map(|p| p.0).collect();

        KzgSettings::load_trusted_setup(&g1_monomial, &g1_lagrange, &g2_monomial, NO_PRECOMPUTE)
            .map_err(|e| KzgError::TrustedSetupLoad(format!("Failed to load KZG settings: {e:?}")))
    }
}

mod hex_serde {
    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        bytes.try_into().map_err(|bytes: Vec<u8>| {
            serde::de::Error::custom(format!("Expected {} bytes, got {}", N, bytes.len()))
        })
    }
}

/// [`KzgBackend`] over the `c-kzg` reference implementation.
#[derive(Clone)]
pub struct CKzgBackend {
    settings: Arc<KzgSettings>,
}

impl CKzgBackend {
    /// Backend over the Ethereum mainnet trusted setup bundled with `c-kzg`.
    pub fn ethereum() -> Self {
        Self { settings: c_kzg::ethereum_kzg_settings_arc(NO_PRECOMPUTE) }
    }

    /// Backend over a JSON trusted setup file (`g1_monomial`, `g1_lagrange`,
    /// `g2_monomial` arrays of hex points).
    pub fn from_trusted_setup_file(path: &Path) -> Result<Self, KzgError> {
        let bytes = std::fs::read(path).map_err(|e| {
            KzgError::TrustedSetupLoad(format!("Failed to read {}: {e}", path.display()))
        })?;

        let trusted_setup: TrustedSetup = serde_json::from_slice(&bytes).map_err(|e| {
            KzgError::TrustedSetupLoad(format!("Failed to parse trusted setup: {e}"))
        })?;

        Ok(Self { settings: Arc::new(trusted_setup.into_settings()?) })
    }

    fn to_ckzg_blob(blob: &Blob) -> Result<CKzgBlob, KzgError> {
        CKzgBlob::from_bytes(blob.data()).map_err(|e| KzgError::InvalidBlob(format!("{e:?}")))
    }
}

impl fmt::Debug for CKzgBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CKzgBackend").finish_non_exhaustive()
    }
}

impl KzgBackend for CKzgBackend {
    fn blob_to_commitment(&self, blob: &Blob) -> Result<KzgCommitment, KzgError> {
        let blob = Self::to_ckzg_blob(blob)?;
        let commitment = self
            .settings
            .blob_to_kzg_commitment(&blob)
            .map_err(|e| KzgError::Computation(format!("{e:?}")))?;
        Ok(KzgCommitment::new(commitment.to_bytes().into_inner()))
    }

    fn compute_proof(
        &self,
        blob: &Blob,
        commitment: &KzgCommitment,
    ) -> Result<KzgProof, KzgError> {
        let blob = Self::to_ckzg_blob(blob)?;
        let commitment = Bytes48::from_bytes(commitment.as_bytes())
            .map_err(|e| KzgError::InvalidCommitment(format!("{e:?}")))?;
        let proof = self
            .settings
            .compute_blob_kzg_proof(&blob, &commitment)
            .map_err(|e| KzgError::Computation(format!("{e:?}")))?;
        Ok(KzgProof::new(proof.to_bytes().into_inner()))
    }

    fn verify_proof(
        &self,
        blob: &Blob,
        commitment: &KzgCommitment,
        proof: &KzgProof,
    ) -> Result<bool, KzgError> {
        let blob = Self::to_ckzg_blob(blob)?;
        let commitment = Bytes48::from_bytes(commitment.as_bytes())
            .map_err(|e| KzgError::InvalidCommitment(format!("{e:?}")))?;
        let proof = Bytes48::from_bytes(proof.as_bytes())
            .map_err(|e| KzgError::InvalidProof(format!("{e:?}")))?;
        self.settings
            .verify_blob_kzg_proof(&blob, &commitment, &proof)
            .map_err(|e| KzgError::Computation(format!("{e:?}")))
    }
}
