//! Blob transaction bookkeeping for the conformance harness.
//!
//! [`BlobTransactionCreator`] turns a handful of parameters into a signed
//! blob transaction plus the wrap data it commits to. [`TestBlobTxPool`]
//! remembers every such transaction the harness has sent so that built
//! payloads can later be checked against the blobs that went in.

pub mod accounts;
pub mod creator;
pub mod error;
pub mod pool;

pub use accounts::{TEST_MNEMONIC, TestAccounts};
pub use creator::BlobTransactionCreator;
pub use error::PoolError;
pub use pool::TestBlobTxPool;
