//! Blob data engine for the conformance harness
//!
//! This crate produces every blob the harness ever sends and checks every
//! blob it gets back:
//! - **Synthesis**: a [`BlobId`] deterministically expands to a valid blob
//! - **Commitments**: commitments, proofs and versioned hashes via an opaque
//!   [`KzgBackend`]
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               CommitmentEngine               │
//! │  (ordered, all-or-nothing commitment lists)  │
//! └──────────┬───────────────────────┬───────────┘
//!            │                       │
//!     ┌──────▼──────┐        ┌───────▼────────┐
//!     │   BlobId    │        │  KzgBackend    │
//!     │ (hash-chain │        │    (trait)     │
//!     │  synthesis) │        └───────┬────────┘
//!     └─────────────┘                │
//!                            ┌───────▼────────┐
//!                            │  CKzgBackend   │
//!                            │ (c-kzg setup)  │
//!                            └────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cobalt_blob_engine::{BlobId, CKzgBackend, CommitmentEngine};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Build the capability once per run and share it.
//! let engine = CommitmentEngine::new(Arc::new(CKzgBackend::ethereum()));
//!
//! // Wrap data for blobs 1, 2 and 3.
//! let (wrap, hashes) = engine.wrap_data(BlobId(1), 3)?;
//! assert_eq!(wrap.len(), hashes.len());
//!
//! // Anything read back can be checked against its identifier.
//! assert!(BlobId(2).verify(&wrap.blobs[1]));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Commitment, proof and versioned-hash computation over blob lists.
pub mod commitments;
/// Error types for the blob engine.
pub mod error;
/// The commitment capability and its c-kzg implementation.
pub mod kzg;
/// Deterministic blob synthesis and identifier ranges.
pub mod synth;

// Re-export main types
pub use commitments::{CommitmentEngine, CommittedBlobs};
pub use error::{BlobEngineError, BlobSynthError, KzgError};
pub use kzg::{CKzgBackend, KzgBackend};
pub use synth::{BlobId, blob_range, blob_range_by_index};
