//! Shared builders for the step integration tests.
//!
//! Every test owns its own in-memory execution client and block producer, so
//! tests are independent and run in parallel.

#![allow(dead_code)]

use cobalt_steps::{NewPayloadExpectation, NewPayloads, SendBlobTransactions};
use cobalt_test_support::Harness;
use cobalt_types::fork::ForkConfig;

/// Cancun (and Shanghai) active from genesis.
pub(crate) fn cancun_harness() -> Harness {
    Harness::new(ForkConfig::cancun_at_genesis()).expect("harness")
}

/// Shanghai at genesis, Cancun from timestamp `cancun_at`.
pub(crate) fn shanghai_harness(cancun_at: u64) -> Harness {
    let forks = ForkConfig {
        shanghai_timestamp: Some(0),
        cancun_timestamp: Some(cancun_at),
        prague_timestamp: None,
    };
    Harness::new(forks).expect("harness")
}

pub(crate) fn send(transactions: u64, blobs_each: u64) -> SendBlobTransactions {
    SendBlobTransactions {
        transaction_count: transactions,
        blobs_per_transaction: blobs_each,
        ..Default::default()
    }
}

pub(crate) fn payloads(expected_blobs: u64) -> NewPayloads {
    NewPayloads { expected_included_blob_count: expected_blobs, ..Default::default() }
}

pub(crate) fn expecting(step: NewPayloads, expectation: NewPayloadExpectation) -> NewPayloads {
    NewPayloads { expectation, ..step }
}
