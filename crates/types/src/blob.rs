//! EIP-4844 Blob Types
//!
//! Fixed-size blob, commitment and proof values together with the two
//! containers that carry them around the harness:
//!
//! ```text
//! BlobTxWrapData (built locally, never in the tx body)
//!     ├─> Vec<Blob>           (131,072 bytes each)
//!     ├─> Vec<KzgCommitment>  (48 bytes each)
//!     └─> Vec<KzgProof>       (48 bytes each)
//!
//! BlobsBundle (returned by engine_getPayloadV3+)
//!     └─> same three arrays, in payload transaction order
//! ```
//!
//! All three value types have a canonical text form: `0x` followed by exactly
//! twice their byte length in hex characters. Anything else is rejected.
//!
//! ## References
//!
//! - EIP-4844: <https://eips.ethereum.org/EIPS/eip-4844>
//! - Engine API (Cancun): <https://github.com/ethereum/execution-apis/blob/main/src/engine/cancun.md>

use std::{fmt, str::FromStr};

use alloy_rpc_types_engine::BlobsBundleV1;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::{
    aliases::{B256, Bytes, VersionedHash},
    constants::{BYTES_PER_FIELD_ELEMENT, FIELD_ELEMENTS_PER_BLOB, MAX_BLOBS_PER_BLOCK},
    error::BlobTypeError,
};

/// The number of bytes in a single blob.
///
/// 4096 field elements of 32 bytes each. Part of the consensus protocol.
pub const BYTES_PER_BLOB: usize = FIELD_ELEMENTS_PER_BLOB * BYTES_PER_FIELD_ELEMENT;

/// The size of a KZG commitment in bytes (compressed BLS12-381 G1 point).
pub const BYTES_PER_COMMITMENT: usize = 48;

/// The size of a KZG proof in bytes (compressed BLS12-381 G1 point).
pub const BYTES_PER_PROOF: usize = 48;

/// Strips the `0x` prefix and decodes exactly `expected` bytes of hex.
fn decode_prefixed_hex(
    field: &'static str,
    s: &str,
    expected: usize,
) -> Result<Vec<u8>, BlobTypeError> {
    let digits = s.strip_prefix("0x").ok_or(BlobTypeError::MissingPrefix { field })?;
    if digits.len() != expected * 2 {
        return Err(BlobTypeError::InvalidLength {
            field,
            expected: expected * 2,
            actual: digits.len(),
        });
    }
    hex::decode(digits).map_err(|source| BlobTypeError::InvalidHex { field, source })
}

/// Derives a versioned hash: `sha256(commitment)` with the first byte replaced by `version`.
///
/// Clients reject any blob transaction whose hashes are not reproduced exactly
/// this way, so the function takes the version explicitly to let negative tests
/// produce hashes with an unsupported version byte.
pub fn compute_versioned_hash(commitment: &KzgCommitment, version: u8) -> VersionedHash {
    let mut hash: [u8; 32] = Sha256::digest(commitment.as_bytes()).into();
    hash[0] = version;
    B256::from(hash)
}

/// A single blob.
///
/// **Invariant**: the backing buffer is exactly [`BYTES_PER_BLOB`] bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
}

impl Blob {
    /// Creates a blob, rejecting buffers that are not exactly [`BYTES_PER_BLOB`] long.
    pub fn new(data: Bytes) -> Result<Self, BlobTypeError> {
        if data.len() != BYTES_PER_BLOB {
            return Err(BlobTypeError::InvalidLength {
                field: "blob",
                expected: BYTES_PER_BLOB,
                actual: data.len(),
            });
        }

        Ok(Self { data })
    }

    /// The canonical all-zero blob.
    pub fn zeroed() -> Self {
        Self { data: Bytes::from(vec![0u8; BYTES_PER_BLOB]) }
    }

    /// Returns a reference to the blob data.
    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns the `index`-th 32-byte field element.
    pub fn field_element(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(BYTES_PER_FIELD_ELEMENT)?;
        self.data.get(start..start + BYTES_PER_FIELD_ELEMENT)
    }

    /// Returns `true` if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|b| *b == 0)
    }

    /// Consumes the blob and returns the underlying data.
    #[inline]
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

impl From<Box<[u8; BYTES_PER_BLOB]>> for Blob {
    fn from(bytes: Box<[u8; BYTES_PER_BLOB]>) -> Self {
        let bytes: Box<[u8]> = bytes;
        Self { data: Bytes::from(bytes.into_vec()) }
    }
}

// A full hex dump of 128 KiB is useless in logs.
impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob(0x{}..)", hex::encode(&self.data[..8]))
    }
}

impl fmt::Display for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.data))
    }
}

impl FromStr for Blob {
    type Err = BlobTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_prefixed_hex("blob", s, BYTES_PER_BLOB)?;
        Self::new(Bytes::from(bytes))
    }
}

/// A KZG commitment to a blob.
///
/// The bytes are not validated as a curve point here; the commitment
/// capability does that when it is handed one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KzgCommitment(pub [u8; BYTES_PER_COMMITMENT]);

impl KzgCommitment {
    /// Creates a new KZG commitment from a 48-byte array.
    #[inline]
    pub const fn new(bytes: [u8; BYTES_PER_COMMITMENT]) -> Self {
        Self(bytes)
    }

    /// Returns a reference to the underlying bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; BYTES_PER_COMMITMENT] {
        &self.0
    }

    /// Creates a commitment from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, BlobTypeError> {
        let array = bytes.try_into().map_err(|_| BlobTypeError::InvalidLength {
            field: "commitment",
            expected: BYTES_PER_COMMITMENT,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Versioned hash of this commitment with the given version byte.
    pub fn versioned_hash(&self, version: u8) -> VersionedHash {
        compute_versioned_hash(self, version)
    }
}

impl fmt::Display for KzgCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for KzgCommitment {
    type Err = BlobTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&decode_prefixed_hex("commitment", s, BYTES_PER_COMMITMENT)?)
    }
}

/// A KZG proof binding a blob to its commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KzgProof(pub [u8; BYTES_PER_PROOF]);

impl KzgProof {
    /// Creates a new KZG proof from a 48-byte array.
    #[inline]
    pub const fn new(bytes: [u8; BYTES_PER_PROOF]) -> Self {
        Self(bytes)
    }

    /// Returns a reference to the underlying bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; BYTES_PER_PROOF] {
        &self.0
    }

    /// Creates a proof from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, BlobTypeError> {
        let array = bytes.try_into().map_err(|_| BlobTypeError::InvalidLength {
            field: "proof",
            expected: BYTES_PER_PROOF,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }
}

impl fmt::Display for KzgProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for KzgProof {
    type Err = BlobTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&decode_prefixed_hex("proof", s, BYTES_PER_PROOF)?)
    }
}

/// Serde goes through the canonical text form so JSON bundles decode with the
/// same strict length and prefix rules.
macro_rules! impl_text_serde {
    ($($ty:ty),+ $(,)?) => {$(
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    )+};
}

impl_text_serde!(Blob, KzgCommitment, KzgProof);

/// Checks the three parallel arrays for equal length and the per-block limit.
fn check_parallel_lengths(
    blobs: usize,
    commitments: usize,
    proofs: usize,
) -> Result<(), BlobTypeError> {
    if blobs != commitments || blobs != proofs {
        return Err(BlobTypeError::LengthMismatch { blobs, commitments, proofs });
    }
    let max = MAX_BLOBS_PER_BLOCK as usize;
    if blobs > max {
        return Err(BlobTypeError::TooManyBlobs { count: blobs, max });
    }
    Ok(())
}

/// The wrap data accompanying a blob-carrying transaction.
///
/// Travels next to the signed transaction in the network encoding and is
/// never part of the transaction body itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobTxWrapData {
    pub blobs: Vec<Blob>,
    pub commitments: Vec<KzgCommitment>,
    pub proofs: Vec<KzgProof>,
}

impl BlobTxWrapData {
    pub fn new(blobs: Vec<Blob>, commitments: Vec<KzgCommitment>, proofs: Vec<KzgProof>) -> Self {
        Self { blobs, commitments, proofs }
    }

    /// Equal lengths across the three arrays, within the per-block limit.
    pub fn validate(&self) -> Result<(), BlobTypeError> {
        check_parallel_lengths(self.blobs.len(), self.commitments.len(), self.proofs.len())
    }

    /// Versioned hashes of every commitment, in order.
    pub fn versioned_hashes(&self, version: u8) -> Vec<VersionedHash> {
        self.commitments.iter().map(|c| c.versioned_hash(version)).collect()
    }

    /// Appends another transaction's wrap data, keeping the arrays parallel.
    pub fn extend_from(&mut self, other: &BlobTxWrapData) {
        self.blobs.extend(other.blobs.iter().cloned());
        self.commitments.extend_from_slice(&other.commitments);
        self.proofs.extend_from_slice(&other.proofs);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

/// Blobs, commitments and proofs returned by the execution client alongside
/// a built payload.
///
/// Entry `i` belongs to the `i`-th blob of the payload when blob transactions
/// are walked in inclusion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobsBundle {
    pub commitments: Vec<KzgCommitment>,
    pub proofs: Vec<KzgProof>,
    pub blobs: Vec<Blob>,
}

impl BlobsBundle {
    /// Creates a new bundle. Call [`BlobsBundle::validate`] before trusting it.
    pub fn new(commitments: Vec<KzgCommitment>, proofs: Vec<KzgProof>, blobs: Vec<Blob>) -> Self {
        Self { commitments, proofs, blobs }
    }

    /// Checks that all three arrays have the same length and that the blob
    /// count stays within [`MAX_BLOBS_PER_BLOCK`].
    pub fn validate(&self) -> Result<(), BlobTypeError> {
        check_parallel_lengths(self.blobs.len(), self.commitments.len(), self.proofs.len())
    }

    /// Versioned hashes of every commitment in the bundle.
    pub fn versioned_hashes(&self, version: u8) -> Vec<VersionedHash> {
        self.commitments.iter().map(|c| c.versioned_hash(version)).collect()
    }

    /// Returns the number of blobs in the bundle.
    #[inline]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns `true` if the bundle contains no blobs.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl From<BlobTxWrapData> for BlobsBundle {
    fn from(wrap: BlobTxWrapData) -> Self {
        Self { commitments: wrap.commitments, proofs: wrap.proofs, blobs: wrap.blobs }
    }
}

/// Convert from Alloy's `BlobsBundleV1`, the shape of the `getPayloadV3`
/// response, into the harness type.
impl TryFrom<BlobsBundleV1> for BlobsBundle {
    type Error = BlobTypeError;

    fn try_from(alloy_bundle: BlobsBundleV1) -> Result<Self, Self::Error> {
        let commitments = alloy_bundle
            .commitments
            .iter()
            .map(|bytes48| KzgCommitment::from_slice(bytes48.as_slice()))
            .collect::<Result<Vec<_>, _>>()?;

        let proofs = alloy_bundle
            .proofs
            .iter()
            .map(|bytes48| KzgProof::from_slice(bytes48.as_slice()))
            .collect::<Result<Vec<_>, _>>()?;

        let blobs = alloy_bundle
            .blobs
            .iter()
            .map(|alloy_blob| Blob::new(Bytes::copy_from_slice(alloy_blob.as_slice())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { commitments, proofs, blobs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BLOB_COMMITMENT_VERSION_KZG;

    fn patterned_blob(seed: u8) -> Blob {
        let data: Vec<u8> =
            (0..BYTES_PER_BLOB).map(|i| (i as u8).wrapping_mul(seed) & 0x3f).collect();
        Blob::new(Bytes::from(data)).unwrap()
    }

    /// Blob construction enforces the exact size.
    #[test]
    fn test_blob_size_validation() {
        assert!(Blob::new(Bytes::from(vec![0u8; BYTES_PER_BLOB])).is_ok());

        let err = Blob::new(Bytes::from(vec![0u8; 1000])).unwrap_err();
        assert!(matches!(
            err,
            BlobTypeError::InvalidLength { field: "blob", expected: BYTES_PER_BLOB, actual: 1000 }
        ));

        assert!(Blob::new(Bytes::from(vec![0u8; BYTES_PER_BLOB + 1])).is_err());
    }

    #[test]
    fn test_blob_text_roundtrip() {
        let blob = patterned_blob(7);
        let text = blob.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + 2 * BYTES_PER_BLOB);
        assert_eq!(text.parse::<Blob>().unwrap(), blob);
    }

    /// Missing prefix and off-by-one lengths are decode failures.
    #[test]
    fn test_blob_text_rejects_malformed_input() {
        let text = Blob::zeroed().to_string();

        let err = text[2..].parse::<Blob>().unwrap_err();
        assert!(matches!(err, BlobTypeError::MissingPrefix { field: "blob" }));

        let short = &text[..text.len() - 2];
        let err = short.parse::<Blob>().unwrap_err();
        assert!(matches!(err, BlobTypeError::InvalidLength { field: "blob", .. }));

        let mut long = text.clone();
        long.push_str("00");
        assert!(long.parse::<Blob>().is_err());

        let mut bad_digit = text;
        bad_digit.replace_range(2..3, "z");
        assert!(matches!(
            bad_digit.parse::<Blob>().unwrap_err(),
            BlobTypeError::InvalidHex { field: "blob", .. }
        ));
    }

    #[test]
    fn test_commitment_and_proof_text_format() {
        let commitment = KzgCommitment([0xab; 48]);
        let text = commitment.to_string();
        assert_eq!(text.len(), 2 + 96);
        assert_eq!(text.parse::<KzgCommitment>().unwrap(), commitment);

        let err = "0xabcd".parse::<KzgProof>().unwrap_err();
        assert!(matches!(
            err,
            BlobTypeError::InvalidLength { field: "proof", expected: 96, actual: 4 }
        ));
        assert!(hex::encode([1u8; 48]).parse::<KzgProof>().is_err());
    }

    /// JSON goes through the same strict text form.
    #[test]
    fn test_serde_uses_text_encoding() {
        let commitment = KzgCommitment([0x11; 48]);
        let json = serde_json::to_string(&commitment).unwrap();
        assert_eq!(json, format!("\"{commitment}\""));
        assert_eq!(serde_json::from_str::<KzgCommitment>(&json).unwrap(), commitment);

        assert!(serde_json::from_str::<KzgCommitment>("\"0x11\"").is_err());
    }

    #[test]
    fn test_versioned_hash_layout() {
        let commitment = KzgCommitment([0x42; 48]);
        let digest: [u8; 32] = Sha256::digest(commitment.as_bytes()).into();

        let hash = compute_versioned_hash(&commitment, BLOB_COMMITMENT_VERSION_KZG);
        assert_eq!(hash[0], BLOB_COMMITMENT_VERSION_KZG);
        assert_eq!(&hash[1..], &digest[1..]);

        let other = compute_versioned_hash(&commitment, 0x02);
        assert_eq!(other[0], 0x02);
        assert_eq!(&other[1..], &hash[1..]);
    }

    /// Test that BlobsBundle validates length consistency.
    #[test]
    fn test_bundle_length_validation() {
        let blob = Blob::zeroed();
        let commitment = KzgCommitment([0u8; 48]);
        let proof = KzgProof([0u8; 48]);

        let valid_bundle = BlobsBundle::new(vec![commitment], vec![proof], vec![blob.clone()]);
        assert!(valid_bundle.validate().is_ok());

        let invalid_bundle =
            BlobsBundle::new(vec![commitment, commitment], vec![proof], vec![blob]);
        assert!(matches!(
            invalid_bundle.validate().unwrap_err(),
            BlobTypeError::LengthMismatch { blobs: 1, commitments: 2, proofs: 1 }
        ));
    }

    #[test]
    fn test_bundle_max_blobs() {
        let max = MAX_BLOBS_PER_BLOCK as usize;
        let commitment = KzgCommitment([0u8; 48]);
        let proof = KzgProof([0u8; 48]);

        let at_limit = BlobsBundle::new(
            vec![commitment; max],
            vec![proof; max],
            vec![Blob::zeroed(); max],
        );
        assert!(at_limit.validate().is_ok());

        let over_limit = BlobsBundle::new(
            vec![commitment; max + 1],
            vec![proof; max + 1],
            vec![Blob::zeroed(); max + 1],
        );
        assert!(matches!(over_limit.validate().unwrap_err(), BlobTypeError::TooManyBlobs { .. }));
    }

    #[test]
    fn test_wrap_data_extend_keeps_order() {
        let mut wrap = BlobTxWrapData::new(
            vec![patterned_blob(1)],
            vec![KzgCommitment([1; 48])],
            vec![KzgProof([1; 48])],
        );
        let other = BlobTxWrapData::new(
            vec![patterned_blob(2)],
            vec![KzgCommitment([2; 48])],
            vec![KzgProof([2; 48])],
        );
        wrap.extend_from(&other);

        assert_eq!(wrap.len(), 2);
        assert_eq!(wrap.commitments[1], KzgCommitment([2; 48]));
        assert_eq!(wrap.blobs[1], patterned_blob(2));

        let hashes = wrap.versioned_hashes(BLOB_COMMITMENT_VERSION_KZG);
        let bundle = BlobsBundle::from(wrap);
        assert_eq!(bundle.versioned_hashes(BLOB_COMMITMENT_VERSION_KZG), hashes);
    }

    /// Conversion from Alloy's BlobsBundleV1, as received from getPayloadV3.
    #[test]
    fn test_blobs_bundle_conversion_from_alloy() {
        use alloy_consensus::{Blob as AlloyBlob, Bytes48};

        let alloy_bundle = BlobsBundleV1 {
            commitments: vec![Bytes48::from([1u8; 48])],
            proofs: vec![Bytes48::from([2u8; 48])],
            blobs: vec![AlloyBlob::from([3u8; BYTES_PER_BLOB])],
        };

        let bundle = BlobsBundle::try_from(alloy_bundle).unwrap();

        assert_eq!(bundle.commitments[0].as_bytes(), &[1u8; 48]);
        assert_eq!(bundle.proofs[0].as_bytes(), &[2u8; 48]);
        assert_eq!(bundle.blobs[0].data().as_ref(), &[3u8; BYTES_PER_BLOB]);
        assert!(bundle.validate().is_ok());
    }
}
