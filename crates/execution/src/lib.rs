// crates/execution/src/lib.rs

//! The execution client as seen by the conformance harness.
//!
//! Only the interface lives here. Wire framing is the transport's business;
//! tests plug in the in-memory node from `cobalt-test-support`.

pub mod client;
pub mod engine_api;
pub mod error;
pub mod eth_rpc;

pub use client::ExecutionClient;
pub use engine_api::{EngineApi, EngineMethod};
pub use error::{ExecutionError, rpc_error_code};
pub use eth_rpc::{EthRpc, ReceiptSummary};
