//! Consensus-layer stand-in that drives block production.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError, RwLock},
    time::Duration,
};

use alloy_primitives::{Address, B256};
use alloy_rpc_types_engine::{ForkchoiceState, PayloadAttributes, PayloadStatusEnum};
use async_trait::async_trait;
use cobalt_execution::ExecutionClient;
use cobalt_steps::{BlockProcessHooks, BlockProducer, StepError};
use cobalt_types::{
    blob::BlobsBundle, constants::BLOB_COMMITMENT_VERSION_KZG, fork::ForkConfig,
    payload::ExecutableData,
};
use color_eyre::eyre::{self, WrapErr};
use tracing::{debug, info};

const DEFAULT_BLOCK_TIME: u64 = 1;

struct ProducerState {
    head: ExecutableData,
    latest_payload: Option<ExecutableData>,
    latest_bundle: Option<BlobsBundle>,
    get_payload_delay: Duration,
}

/// Produces blocks through the first registered client and broadcasts them
/// to every other registered client.
///
/// Timestamps advance by a fixed block time from the genesis head.
pub struct MockBlockProducer {
    fork_config: ForkConfig,
    block_time: u64,
    clients: RwLock<Vec<ExecutionClient>>,
    state: Mutex<ProducerState>,
}

fn producer_error(report: eyre::Report) -> StepError {
    StepError::Producer(report)
}

impl MockBlockProducer {
    pub fn new(fork_config: ForkConfig, genesis: ExecutableData) -> Self {
        Self {
            fork_config,
            block_time: DEFAULT_BLOCK_TIME,
            clients: RwLock::new(Vec::new()),
            state: Mutex::new(ProducerState {
                head: genesis,
                latest_payload: None,
                latest_bundle: None,
                get_payload_delay: Duration::ZERO,
            }),
        }
    }

    pub fn with_block_time(mut self, seconds: u64) -> Self {
        self.block_time = seconds;
        self
    }

    pub fn head(&self) -> ExecutableData {
        self.lock().head.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ProducerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clients(&self) -> Vec<ExecutionClient> {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn attributes(&self, head: &ExecutableData) -> PayloadAttributes {
        let timestamp = head.timestamp + self.block_time;
        let number = head.block_number + 1;
        PayloadAttributes {
            timestamp,
            prev_randao: B256::left_padding_from(&number.to_be_bytes()),
            suggested_fee_recipient: Address::ZERO,
            withdrawals: self.fork_config.is_shanghai(timestamp).then(Vec::new),
            parent_beacon_block_root: self
                .fork_config
                .is_cancun(timestamp)
                .then(|| B256::right_padding_from(&number.to_be_bytes())),
        }
    }
}

impl fmt::Debug for MockBlockProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBlockProducer")
            .field("fork_config", &self.fork_config)
            .field("block_time", &self.block_time)
            .field("clients", &self.clients().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BlockProducer for MockBlockProducer {
    async fn produce_single_block(
        &self,
        hooks: &mut dyn BlockProcessHooks,
    ) -> Result<(), StepError> {
        let clients = self.clients();
        let Some(builder) = clients.first() else {
            return Err(producer_error(eyre::eyre!("no client registered for production")));
        };

        let head = self.head();
        let attrs = self.attributes(&head);
        let timestamp = attrs.timestamp;
        let fcu_version =
            self.fork_config.forkchoice_updated_version(head.timestamp, Some(timestamp));

        let head_state = ForkchoiceState::same_hash(head.block_hash);
        let updated = builder
            .engine()
            .forkchoice_updated(fcu_version, head_state, Some(attrs))
            .await
            .wrap_err_with(|| format!("{}: forkchoiceUpdated with attributes", builder.name()))
            .map_err(producer_error)?;
        let payload_id = updated.payload_id.ok_or_else(|| {
            producer_error(eyre::eyre!(
                "{}: no payload id ({:?})",
                builder.name(),
                updated.payload_status.status
            ))
        })?;
        hooks.on_payload_request().await?;

        let delay = self.lock().get_payload_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let version = self.fork_config.get_payload_version(timestamp);
        let built = builder
            .engine()
            .get_payload(version, payload_id)
            .await
            .wrap_err_with(|| format!("{}: getPayload", builder.name()))
            .map_err(producer_error)?;
        let payload = built.payload;
        let hashes = built
            .blobs_bundle
            .as_ref()
            .map(|bundle| bundle.versioned_hashes(BLOB_COMMITMENT_VERSION_KZG));
        {
            let mut state = self.lock();
            state.latest_payload = Some(payload.clone());
            state.latest_bundle = built.blobs_bundle;
        }
        debug!(
            number = payload.block_number,
            txs = payload.transactions.len(),
            blobs = hashes.as_ref().map_or(0, Vec::len),
            "Got payload"
        );
        hooks.on_get_payload().await?;

        let new_payload_version = self.fork_config.new_payload_version(timestamp);
        for (index, client) in clients.iter().enumerate() {
            let status = client
                .engine()
                .new_payload(new_payload_version, &payload, hashes.clone())
                .await
                .wrap_err_with(|| format!("{}: newPayload", client.name()))
                .map_err(producer_error)?;
            let rejected = match status.status {
                PayloadStatusEnum::Invalid { .. } => true,
                PayloadStatusEnum::Valid => false,
                _ => index == 0,
            };
            if rejected {
                return Err(producer_error(eyre::eyre!(
                    "{}: newPayload returned {:?}",
                    client.name(),
                    status.status
                )));
            }
        }
        hooks.on_new_payload_broadcast().await?;

        let fcu_version = self.fork_config.forkchoice_updated_version(timestamp, None);
        let state = ForkchoiceState::same_hash(payload.block_hash);
        for (index, client) in clients.iter().enumerate() {
            let updated = client
                .engine()
                .forkchoice_updated(fcu_version, state, None)
                .await
                .wrap_err_with(|| format!("{}: forkchoiceUpdated", client.name()))
                .map_err(producer_error)?;
            if index == 0 && !updated.payload_status.is_valid() {
                return Err(producer_error(eyre::eyre!(
                    "{}: forkchoiceUpdated returned {:?}",
                    client.name(),
                    updated.payload_status.status
                )));
            }
        }
        self.lock().head = payload.clone();
        info!(number = payload.block_number, hash = %payload.block_hash, "Produced block");
        hooks.on_forkchoice_broadcast().await
    }

    fn latest_payload_built(&self) -> Option<ExecutableData> {
        self.lock().latest_payload.clone()
    }

    fn latest_blobs_bundle(&self) -> Option<BlobsBundle> {
        self.lock().latest_bundle.clone()
    }

    fn add_engine_client(&self, client: ExecutionClient) {
        self.clients.write().unwrap_or_else(PoisonError::into_inner).push(client);
    }

    fn get_payload_delay(&self) -> Duration {
        self.lock().get_payload_delay
    }

    fn set_get_payload_delay(&self, delay: Duration) {
        self.lock().get_payload_delay = delay;
    }
}
