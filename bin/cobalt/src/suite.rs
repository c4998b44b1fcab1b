//! Built-in blob scenarios, run against the in-memory execution client.

use std::{sync::Arc, time::Instant};

use cobalt_blob_engine::{BlobId, CKzgBackend, KzgBackend, blob_range};
use cobalt_cli::{cmd::run::RunCmd, config::RunConfig};
use cobalt_steps::{
    BlockProducer, LaunchClients, NewPayloadExpectation, NewPayloads, ParallelSteps,
    PayloadStatusKind, SendBlobTransactions, SendModifiedLatestPayload, TestSequence,
    VersionedHashes,
};
use cobalt_test_support::{FakeKzg, Harness};
use cobalt_types::{
    constants::{MAX_BLOBS_PER_BLOCK, TARGET_BLOBS_PER_BLOCK},
    fees::min_excess_blobs_for_blob_gas_price,
    fork::ForkConfig,
};
use color_eyre::eyre::{self, WrapErr};
use tracing::{Instrument, error, info, info_span, warn};

/// A named sequence of steps.
pub struct Scenario {
    pub name: &'static str,
    pub about: &'static str,
    /// Fixed schedule for scenarios that exercise a fork boundary. Others
    /// use the configured schedule.
    pub forks: Option<ForkConfig>,
    build: fn(&Harness) -> TestSequence,
}

impl Scenario {
    fn forks(&self, configured: ForkConfig) -> ForkConfig {
        self.forks.unwrap_or(configured)
    }

    /// Scenarios on the configured schedule expect blobs from the first block.
    fn runnable(&self, configured: &ForkConfig) -> bool {
        self.forks.is_some() || configured.is_cancun(1)
    }
}

fn send(transactions: u64, blobs_each: u64) -> SendBlobTransactions {
    SendBlobTransactions {
        transaction_count: transactions,
        blobs_per_transaction: blobs_each,
        ..Default::default()
    }
}

fn payloads(expected_blobs: u64) -> NewPayloads {
    NewPayloads { expected_included_blob_count: expected_blobs, ..Default::default() }
}

fn single_blob(_: &Harness) -> TestSequence {
    TestSequence::new()
        .step(send(1, 1))
        .step(NewPayloads { expected_blobs: vec![BlobId(0)], ..payloads(1) })
}

fn max_blobs(_: &Harness) -> TestSequence {
    TestSequence::new()
        .step(send(MAX_BLOBS_PER_BLOCK, 1))
        .step(NewPayloads {
            expected_blobs: blob_range(BlobId(0), MAX_BLOBS_PER_BLOCK),
            ..payloads(MAX_BLOBS_PER_BLOCK)
        })
        .step(send(1, MAX_BLOBS_PER_BLOCK))
        .step(payloads(MAX_BLOBS_PER_BLOCK))
}

/// Fills blocks until the blob base fee reaches 2 wei, then checks that a
/// transaction capped at 1 wei is left out.
fn blob_gas_price_increase(_: &Harness) -> TestSequence {
    let excess_per_block = MAX_BLOBS_PER_BLOCK - TARGET_BLOBS_PER_BLOCK;
    let full_blocks = min_excess_blobs_for_blob_gas_price(2).div_ceil(excess_per_block);

    let mut sequence = TestSequence::new();
    for _ in 0..full_blocks {
        sequence = sequence
            .step(send(MAX_BLOBS_PER_BLOCK, 1))
            .step(payloads(MAX_BLOBS_PER_BLOCK));
    }
    sequence
        .step(SendBlobTransactions { blob_gas_fee_cap: Some(1), ..send(1, 1) })
        .step(payloads(0))
}

fn reordered_versioned_hashes(_: &Harness) -> TestSequence {
    let reordered = VersionedHashes::of([BlobId(1), BlobId(0)]);
    TestSequence::new()
        .step(send(1, 2))
        .step(NewPayloads {
            versioned_hashes: Some(reordered.clone()),
            expectation: NewPayloadExpectation::status(PayloadStatusKind::Invalid),
            ..payloads(2)
        })
        .step(SendModifiedLatestPayload {
            client_index: 0,
            versioned_hashes: reordered,
            expected_status: PayloadStatusKind::Invalid,
        })
}

fn parallel_senders(_: &Harness) -> TestSequence {
    let parallel = ParallelSteps::new()
        .step(SendBlobTransactions { account_index: 1, ..send(2, 1) })
        .step(SendBlobTransactions { account_index: 2, ..send(2, 1) })
        .step(SendBlobTransactions { account_index: 3, ..send(1, 2) });
    TestSequence::new()
        .step(parallel)
        .step(NewPayloads { expected_blobs: blob_range(BlobId(0), 6), ..payloads(6) })
}

fn replace_blob_transaction(_: &Harness) -> TestSequence {
    let replacement = SendBlobTransactions {
        replace_transactions: true,
        gas_fee_cap: Some(60_000_000_000),
        gas_tip_cap: Some(2_000_000_000),
        blob_gas_fee_cap: Some(200),
        ..send(1, 1)
    };
    TestSequence::new()
        .step(send(1, 1))
        .step(replacement)
        .step(NewPayloads { expected_blobs: vec![BlobId(1)], ..payloads(1) })
}

/// A client that never saw the parent still rejects malformed hash lists.
fn syncing_client_hashes(harness: &Harness) -> TestSequence {
    let target = TARGET_BLOBS_PER_BLOCK;
    TestSequence::new()
        .step(payloads(0))
        .step(send(target, 1))
        .step(NewPayloads { expected_blobs: blob_range(BlobId(0), target), ..payloads(target) })
        .step(LaunchClients {
            skip_connecting_to_bootnode: true,
            skip_adding_to_producer: true,
            ..LaunchClients::new(harness.starter.clone())
        })
        .step(SendModifiedLatestPayload {
            client_index: 1,
            versioned_hashes: VersionedHashes::of(blob_range(BlobId(0), target - 1)),
            expected_status: PayloadStatusKind::Invalid,
        })
        .step(SendModifiedLatestPayload {
            client_index: 1,
            versioned_hashes: VersionedHashes::of(blob_range(BlobId(0), target)),
            expected_status: PayloadStatusKind::Syncing,
        })
}

fn fork_transition(_: &Harness) -> TestSequence {
    TestSequence::new()
        .step(send(1, 1))
        .step(payloads(0))
        .step(NewPayloads { expected_blobs: vec![BlobId(0)], ..payloads(1) })
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "blob-transactions-single",
            about: "one zero blob is included in the next payload",
            forks: None,
            build: single_blob,
        },
        Scenario {
            name: "blob-transactions-max",
            about: "full blocks from many single-blob and one max-blob transaction",
            forks: None,
            build: max_blobs,
        },
        Scenario {
            name: "blob-gas-price-increase",
            about: "underpriced blob transactions wait once the blob base fee rises",
            forks: None,
            build: blob_gas_price_increase,
        },
        Scenario {
            name: "invalid-versioned-hashes",
            about: "reordered versioned hashes make newPayload INVALID",
            forks: None,
            build: reordered_versioned_hashes,
        },
        Scenario {
            name: "parallel-senders",
            about: "concurrent senders never share blob identifiers",
            forks: None,
            build: parallel_senders,
        },
        Scenario {
            name: "blob-replacement",
            about: "a transaction replaced with doubled fees is the one included",
            forks: None,
            build: replace_blob_transaction,
        },
        Scenario {
            name: "syncing-client-hashes",
            about: "a syncing client validates the hash list before the parent",
            forks: None,
            build: syncing_client_hashes,
        },
        Scenario {
            name: "cancun-fork-transition",
            about: "blob transactions sent before Cancun are included at activation",
            forks: Some(ForkConfig {
                shanghai_timestamp: Some(0),
                cancun_timestamp: Some(2),
                prague_timestamp: None,
            }),
            build: fork_transition,
        },
    ]
}

fn kzg_backend(config: &RunConfig, fake: bool) -> eyre::Result<Arc<dyn KzgBackend>> {
    if fake {
        return Ok(Arc::new(FakeKzg));
    }
    match &config.kzg.trusted_setup_path {
        Some(path) => Ok(Arc::new(CKzgBackend::from_trusted_setup_file(path)?)),
        None => Ok(Arc::new(CKzgBackend::ethereum())),
    }
}

/// Runs one scenario on a fresh harness.
pub async fn run_scenario(
    scenario: &Scenario,
    config: &RunConfig,
    kzg: Arc<dyn KzgBackend>,
) -> eyre::Result<()> {
    let forks = scenario.forks(config.fork_config()?);
    let harness = Harness::builder(forks)
        .chain_id(config.chain.chain_id)
        .accounts(config.chain.accounts)
        .kzg(kzg)
        .rpc_timeout(config.engine.rpc_timeout())
        .build()?;
    harness.producer.set_get_payload_delay(config.engine.get_payload_delay());

    let sequence = (scenario.build)(&harness);
    info!(steps = sequence.len(), about = scenario.about, "Starting scenario");
    sequence.run(&harness.ctx).await?;
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: Vec<&'static str>,
    pub failed: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

/// Runs every selected scenario, continuing past failures.
pub async fn run(config: &RunConfig, cmd: &RunCmd) -> eyre::Result<Summary> {
    let configured = config.fork_config()?;
    let kzg = kzg_backend(config, cmd.fake_kzg).wrap_err("Failed to load the KZG backend")?;
    let mut summary = Summary::default();

    for scenario in scenarios().iter().filter(|s| cmd.selects(s.name)) {
        if !scenario.runnable(&configured) {
            warn!(scenario = scenario.name, "Cancun is not active at the first block, skipping");
            summary.skipped.push(scenario.name);
            continue;
        }

        let started = Instant::now();
        let span = info_span!("scenario", name = scenario.name);
        match run_scenario(scenario, config, kzg.clone()).instrument(span).await {
            Ok(()) => {
                info!(scenario = scenario.name, elapsed = ?started.elapsed(), "Scenario passed");
                summary.passed.push(scenario.name);
            }
            Err(e) => {
                error!(scenario = scenario.name, error = %format!("{e:#}"), "Scenario failed");
                summary.failed.push(scenario.name);
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn fake_run() -> RunCmd {
        RunCmd { fake_kzg: true, ..Default::default() }
    }

    #[test]
    fn scenario_names_are_unique() {
        let all = scenarios();
        let names: HashSet<_> = all.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), all.len());
    }

    #[tokio::test]
    async fn every_scenario_passes_in_memory() {
        let summary = run(&RunConfig::default(), &fake_run()).await.unwrap();
        assert_eq!(summary.failed, Vec::<&str>::new());
        assert!(summary.skipped.is_empty());
        assert_eq!(summary.passed.len(), scenarios().len());
    }

    #[tokio::test]
    async fn late_cancun_skips_all_but_the_transition() {
        let mut config = RunConfig::default();
        config.forks.cancun = Some(100);

        let summary = run(&config, &fake_run()).await.unwrap();
        assert_eq!(summary.passed, vec!["cancun-fork-transition"]);
        assert_eq!(summary.skipped.len(), scenarios().len() - 1);
    }

    #[tokio::test]
    async fn filters_select_by_substring() {
        let cmd = RunCmd { scenarios: vec!["single".into()], ..fake_run() };
        let summary = run(&RunConfig::default(), &cmd).await.unwrap();
        assert_eq!(summary.passed, vec!["blob-transactions-single"]);
    }
}
