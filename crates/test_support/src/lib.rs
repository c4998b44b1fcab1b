//! In-memory collaborators for exercising the cobalt steps without a live
//! execution client.
//!
//! [`MockExecutionClient`] plays the execution layer, [`MockBlockProducer`]
//! the consensus layer, and [`FakeKzg`] replaces the trusted-setup backed
//! commitment scheme where speed matters more than real cryptography.
//! [`Harness`] wires all of them into a ready [`cobalt_steps::BlobTestContext`].

pub mod fake_kzg;
pub mod harness;
pub mod mock_el;
pub mod producer;

pub use fake_kzg::FakeKzg;
pub use harness::{DEFAULT_CHAIN_ID, Harness, HarnessBuilder, MockClientStarter};
pub use mock_el::{BundleTamper, MockExecutionClient, NewPayloadCall};
pub use producer::MockBlockProducer;
