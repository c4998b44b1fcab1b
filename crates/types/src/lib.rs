//! Shared data types for the cobalt blob conformance engine.
//!
//! Everything here is plain data or pure policy: blob/commitment/proof values
//! and their text encodings, the blob fee market recurrence, the fork to
//! Engine API version tables, and the payload model the engine calls exchange.

#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![allow(missing_docs)]

pub mod aliases;
pub mod blob;
pub mod constants;
pub mod error;
pub mod fees;
pub mod fork;
pub mod payload;
pub mod transaction;

pub use error::BlobTypeError;
