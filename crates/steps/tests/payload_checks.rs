//! Negative paths: tampered bundles, modified payloads and rejected calls.

mod common;

use std::{sync::Arc, time::Duration};

use alloy_primitives::Address;
use cobalt_blob_engine::BlobId;
use cobalt_execution::{EthRpc, ExecutionError};
use cobalt_steps::{
    BlockProducer, CustomPayloadData, NewPayloadExpectation, NewPayloads, PayloadStatusKind,
    StepError, TestSequence, TestStep, VersionedHashes, verify_transaction_from_node,
};
use cobalt_test_support::{DEFAULT_CHAIN_ID, Harness};
use cobalt_txpool::BlobTransactionCreator;
use cobalt_types::{constants::INVALID_PARAMS_ERROR, fork::ForkConfig};
use common::{cancun_harness, expecting, payloads, send};

fn invalid() -> NewPayloadExpectation {
    NewPayloadExpectation::status(PayloadStatusKind::Invalid)
}

#[tokio::test]
async fn swapped_bundle_entries_are_detected() {
    let h = Harness::builder(ForkConfig::cancun_at_genesis())
        .customize_client(|client| {
            client.with_bundle_tamper(|bundle| {
                bundle.blobs.swap(0, 1);
                bundle.commitments.swap(0, 1);
                bundle.proofs.swap(0, 1);
            })
        })
        .build()
        .expect("harness");

    let err =
        TestSequence::new().step(send(1, 2)).step(payloads(2)).run(&h.ctx).await.unwrap_err();

    assert!(matches!(err.root(), StepError::BundleMismatch { what: "KZG", index: 0 }));
    assert!(err.to_string().contains("error verifying blob bundle (payload 1/1)"));
}

#[tokio::test]
async fn missing_expected_blob_fails() {
    let h = cancun_harness();
    let step = NewPayloads { expected_blobs: vec![BlobId(5)], ..payloads(1) };

    let err = TestSequence::new().step(send(1, 1)).step(step).run(&h.ctx).await.unwrap_err();
    assert!(matches!(err.root(), StepError::ExpectedBlobNotFound { id: BlobId(5) }));
}

#[tokio::test]
async fn unexpected_blob_count_fails() {
    let h = cancun_harness();

    let err =
        TestSequence::new().step(send(1, 1)).step(payloads(2)).run(&h.ctx).await.unwrap_err();
    assert!(matches!(err.root(), StepError::BundleBlobCount { expected: 2, actual: 1 }));
}

#[tokio::test]
async fn wrong_blob_gas_used_is_invalid() -> color_eyre::Result<()> {
    let h = cancun_harness();
    let customizer = CustomPayloadData { blob_gas_used: Some(1), ..Default::default() };
    let step = NewPayloads { payload_customizer: Some(Arc::new(customizer)), ..payloads(1) };

    TestSequence::new().step(send(1, 1)).step(expecting(step, invalid())).run(&h.ctx).await?;
    Ok(())
}

#[tokio::test]
async fn old_method_version_is_rejected_with_params_error() -> color_eyre::Result<()> {
    let h = cancun_harness();
    let step = NewPayloads { version: Some(2), ..payloads(1) };

    TestSequence::new()
        .step(send(1, 1))
        .step(expecting(step, NewPayloadExpectation::error(INVALID_PARAMS_ERROR)))
        .run(&h.ctx)
        .await?;
    Ok(())
}

#[tokio::test]
async fn absent_hash_list_is_rejected_with_params_error() -> color_eyre::Result<()> {
    let h = cancun_harness();
    let step = NewPayloads { versioned_hashes: Some(VersionedHashes::default()), ..payloads(1) };

    TestSequence::new()
        .step(send(1, 1))
        .step(expecting(step, NewPayloadExpectation::error(INVALID_PARAMS_ERROR)))
        .run(&h.ctx)
        .await?;
    Ok(())
}

#[tokio::test]
async fn unknown_hash_version_is_invalid() -> color_eyre::Result<()> {
    let h = cancun_harness();
    let hashes = VersionedHashes::of([BlobId(0)]).with_versions(vec![2]);
    let step = NewPayloads { versioned_hashes: Some(hashes), ..payloads(1) };

    TestSequence::new().step(send(1, 1)).step(expecting(step, invalid())).run(&h.ctx).await?;
    Ok(())
}

#[tokio::test]
async fn unmet_expectation_is_reported() {
    let h = cancun_harness();
    let step = expecting(payloads(1), invalid());

    let err = TestSequence::new().step(send(1, 1)).step(step).run(&h.ctx).await.unwrap_err();
    match err.root() {
        StepError::Expectation { expected, actual, .. } => {
            assert_eq!(expected, "status INVALID");
            assert_eq!(actual, "status VALID");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn payload_delay_override_is_restored() {
    let h = cancun_harness();
    let original = Duration::from_millis(3);
    h.producer.set_get_payload_delay(original);

    let delayed = NewPayloads { get_payload_delay: Some(Duration::from_millis(20)), ..payloads(0) };
    delayed.execute(&h.ctx).await.expect("delayed payload");
    assert_eq!(h.producer.get_payload_delay(), original);

    let failing = NewPayloads {
        get_payload_delay: Some(Duration::from_millis(20)),
        expected_blobs: vec![BlobId(0)],
        ..payloads(0)
    };
    assert!(failing.execute(&h.ctx).await.is_err());
    assert_eq!(h.producer.get_payload_delay(), original);
}

#[tokio::test]
async fn blob_transaction_unknown_to_the_pool_fails() {
    let h = cancun_harness();
    let signer = h.ctx.accounts.get(0).expect("account 0");
    let tx = BlobTransactionCreator::new(Address::ZERO)
        .with_blobs(BlobId(100), 1)
        .make_transaction(&h.ctx.engine, signer, 0, DEFAULT_CHAIN_ID)
        .await
        .expect("transaction");
    h.client.send_transaction(&tx).await.expect("accepted by the node");

    let err = payloads(1).execute(&h.ctx).await.unwrap_err();
    let untracked = matches!(
        err.root(),
        StepError::UntrackedTransaction { tx_hash } if *tx_hash == tx.hash()
    );
    assert!(untracked, "unexpected error: {err}");
}

#[tokio::test]
async fn pool_records_submission_order() -> color_eyre::Result<()> {
    let h = cancun_harness();
    send(2, 2).execute(&h.ctx).await?;

    let first = h.ctx.pool.hash_by_index(0).expect("first transaction");
    let second = h.ctx.pool.hash_by_index(1).expect("second transaction");
    assert_ne!(first, second);
    assert_eq!(h.ctx.pool.hash_by_index(2), None);
    assert_eq!(h.ctx.pool.get(&second).map(|tx| tx.nonce()), Some(1));
    assert_eq!(h.ctx.pool.next_blob_id(), BlobId(4));
    Ok(())
}

#[tokio::test]
async fn unsent_transaction_is_not_visible() {
    let h = cancun_harness();
    let signer = h.ctx.accounts.get(1).expect("account 1");
    let tx = BlobTransactionCreator::new(Address::ZERO)
        .with_blobs(BlobId(0), 1)
        .make_transaction(&h.ctx.engine, signer, 0, DEFAULT_CHAIN_ID)
        .await
        .expect("transaction");
    let client = h.ctx.client(0).expect("client 0");

    let err = verify_transaction_from_node(&h.ctx, &client, &tx).await.unwrap_err();
    assert!(matches!(err, StepError::TransactionNotVisible { tx_hash } if tx_hash == tx.hash()));
}

#[tokio::test]
async fn unknown_method_version_is_a_step_error() {
    let h = cancun_harness();
    let step = NewPayloads { version: Some(9), ..payloads(0) };

    let err = step.execute(&h.ctx).await.unwrap_err();
    assert!(err.to_string().starts_with("error sending new payload (payload 1/1)"));
    assert!(matches!(
        err.root(),
        StepError::Execution(ExecutionError::MethodNotSupported(method)) if method == "NewPayloadV9"
    ));
}
