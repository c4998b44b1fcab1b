//! Composable Engine API blob test steps.
//!
//! A test is a [`TestSequence`] of [`TestStep`]s run against a shared
//! [`BlobTestContext`]. Steps send blob transactions, drive the block
//! producer through [`NewPayloads`] cycles, launch extra clients and re-send
//! tampered payloads. [`ParallelSteps`] runs independent steps concurrently.

pub mod context;
pub mod customizer;
pub mod error;
pub mod expect;
pub mod launch;
pub mod modified;
pub mod payloads;
pub mod producer;
pub mod send;
pub mod step;
pub mod verify;
pub mod versioned_hashes;

pub use context::BlobTestContext;
pub use customizer::{CustomPayloadData, PayloadCustomizer};
pub use error::StepError;
pub use expect::{NewPayloadExpectation, PayloadStatusKind};
pub use launch::{ClientStarter, LaunchClients};
pub use modified::SendModifiedLatestPayload;
pub use payloads::NewPayloads;
pub use producer::{BlockProcessHooks, BlockProducer, NoHooks};
pub use send::{SendBlobTransactions, verify_transaction_from_node};
pub use step::{ParallelSteps, TestSequence, TestStep};
pub use versioned_hashes::VersionedHashes;
