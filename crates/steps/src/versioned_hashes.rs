use std::fmt;

use cobalt_blob_engine::{BlobEngineError, BlobId, CommitmentEngine};
use cobalt_types::{aliases::VersionedHash, constants::BLOB_COMMITMENT_VERSION_KZG};
use itertools::Itertools;

/// A deliberately chosen versioned-hash list to submit with `newPayload`.
///
/// `blobs: None` omits the parameter entirely; `Some(vec![])` sends an
/// empty list. Each hash uses the version at the same index of
/// `hash_versions`, or [`BLOB_COMMITMENT_VERSION_KZG`] past its end.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionedHashes {
    pub blobs: Option<Vec<BlobId>>,
    pub hash_versions: Vec<u8>,
}

impl VersionedHashes {
    pub fn of(blobs: impl IntoIterator<Item = BlobId>) -> Self {
        Self { blobs: Some(blobs.into_iter().collect()), hash_versions: Vec::new() }
    }

    pub fn with_versions(mut self, versions: Vec<u8>) -> Self {
        self.hash_versions = versions;
        self
    }

    pub fn versioned_hashes(
        &self,
        engine: &CommitmentEngine,
    ) -> Result<Option<Vec<VersionedHash>>, BlobEngineError> {
        let Some(blobs) = &self.blobs else {
            return Ok(None);
        };

        blobs
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let version =
                    self.hash_versions.get(i).copied().unwrap_or(BLOB_COMMITMENT_VERSION_KZG);
                engine.versioned_hash(*id, version)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

impl fmt::Display for VersionedHashes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionedHashes: ")?;
        match &self.blobs {
            Some(blobs) => write!(f, "[{}]", blobs.iter().join(", "))?,
            None => write!(f, "none")?,
        }
        if !self.hash_versions.is_empty() {
            write!(f, " with versions {:?}", self.hash_versions)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cobalt_blob_engine::CKzgBackend;

    use super::*;

    fn engine() -> CommitmentEngine {
        CommitmentEngine::new(Arc::new(CKzgBackend::ethereum()))
    }

    #[test]
    fn absent_list_is_not_an_empty_list() {
        let engine = engine();
        assert_eq!(VersionedHashes::default().versioned_hashes(&engine).unwrap(), None);
        assert_eq!(VersionedHashes::of([]).versioned_hashes(&engine).unwrap(), Some(vec![]));
    }

    #[test]
    fn versions_default_per_index() {
        let engine = engine();
        let hashes = VersionedHashes::of([BlobId(1), BlobId(2)])
            .with_versions(vec![0x00])
            .versioned_hashes(&engine)
            .unwrap()
            .unwrap();
        assert_eq!(hashes[0][0], 0x00);
        assert_eq!(hashes[1][0], BLOB_COMMITMENT_VERSION_KZG);
        assert_eq!(hashes[1], engine.versioned_hash(BlobId(2), 1).unwrap());
    }

    #[test]
    fn display() {
        let v = VersionedHashes::of([BlobId(1), BlobId(0)]).with_versions(vec![1, 2]);
        assert_eq!(v.to_string(), "VersionedHashes: [1, 0] with versions [1, 2]");
        assert_eq!(VersionedHashes::default().to_string(), "VersionedHashes: none");
    }
}
