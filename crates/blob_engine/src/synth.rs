//! Deterministic blob synthesis.
//!
//! A [`BlobId`] names a blob without storing it. Identifier 0 is the all-zero
//! blob; any other identifier seeds a SHA-256 hash chain whose digests fill
//! the 4096 field elements in order, each clamped below the BLS12-381 scalar
//! modulus so the result is a valid blob for every KZG implementation.

use std::fmt;

use cobalt_types::{
    blob::{BYTES_PER_BLOB, Blob},
    constants::BYTES_PER_FIELD_ELEMENT,
};
use sha2::{Digest, Sha256};

use crate::error::BlobSynthError;

/// BLS12-381 scalar field modulus, big-endian.
pub const BLS_MODULUS: [u8; 32] = [
    0x73, 0xed, 0xa7, 0x53, 0x29, 0x9d, 0x7d, 0x48, 0x33, 0x39, 0xd8, 0x08, 0x09, 0xa1, 0xd8, 0x05,
    0x53, 0xbd, 0xa4, 0x02, 0xff, 0xfe, 0x5b, 0xfe, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x01,
];

/// Identifier of a synthetic blob.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlobId(pub u64);

impl BlobId {
    /// Synthesizes the blob for this identifier.
    pub fn fill(self) -> Blob {
        let mut buf = Box::new([0u8; BYTES_PER_BLOB]);
        self.fill_into(buf.as_mut_slice());
        Blob::from(buf)
    }

    fn fill_into(self, buf: &mut [u8]) {
        if self.0 == 0 {
            buf.fill(0);
            return;
        }

        let mut digest: [u8; 32] = Sha256::digest(self.0.to_be_bytes()).into();
        for element in buf.chunks_exact_mut(BYTES_PER_FIELD_ELEMENT) {
            element.copy_from_slice(&digest);
            clamp_to_modulus(element);
            digest = Sha256::digest(digest).into();
        }
    }

    /// Returns `true` if `blob` is byte-for-byte the blob this identifier synthesizes.
    pub fn verify(self, blob: &Blob) -> bool {
        self.matches(blob.data())
    }

    /// Like [`BlobId::verify`] for a blob that may be absent.
    ///
    /// An absent blob is an error rather than a mismatch so callers can tell
    /// "wrong content" apart from "nothing to compare".
    pub fn verify_blob(self, blob: Option<&Blob>) -> Result<bool, BlobSynthError> {
        blob.map(|b| self.verify(b)).ok_or(BlobSynthError::MissingBlob { id: self })
    }

    /// Verifies raw bytes, which need not have blob length.
    pub fn verify_bytes(self, bytes: &[u8]) -> Result<bool, BlobSynthError> {
        if bytes.len() != BYTES_PER_BLOB {
            return Err(BlobSynthError::InvalidLength { id: self, actual: bytes.len() });
        }
        Ok(self.matches(bytes))
    }

    fn matches(self, bytes: &[u8]) -> bool {
        if self.0 == 0 {
            return bytes.iter().all(|b| *b == 0);
        }
        let mut expected = vec![0u8; BYTES_PER_BLOB];
        self.fill_into(&mut expected);
        expected == bytes
    }

    /// The identifier `n` places after this one, or `None` past `u64::MAX`.
    pub fn checked_offset(self, n: u64) -> Option<BlobId> {
        self.0.checked_add(n).map(BlobId)
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for BlobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Forces a 32-byte big-endian element below [`BLS_MODULUS`].
///
/// Scans most-significant first. At the first position where the element is
/// not already below the modulus: a nonzero modulus byte is matched minus one
/// and the scan stops; a zero modulus byte is copied and the scan continues.
fn clamp_to_modulus(element: &mut [u8]) {
    for (byte, modulus) in element.iter_mut().zip(BLS_MODULUS) {
        if *byte < modulus {
            return;
        }
        if modulus != 0 {
            *byte = modulus - 1;
            return;
        }
        *byte = modulus;
    }
}

/// `count` identifiers ascending from `start`.
///
/// Identifiers do not wrap: the range ends early at `BlobId(u64::MAX)`.
pub fn blob_range(start: BlobId, count: u64) -> Vec<BlobId> {
    (0..count).map_while(|i| start.checked_offset(i)).collect()
}

/// All identifiers between `from` and `to` inclusive.
///
/// Ascending when `from < to`, descending when `from > to`; either way the
/// list has `|from - to| + 1` entries and starts at `from`.
pub fn blob_range_by_index(from: BlobId, to: BlobId) -> Vec<BlobId> {
    if from <= to {
        (from.0..=to.0).map(BlobId).collect()
    } else {
        (to.0..=from.0).rev().map(BlobId).collect()
    }
}
