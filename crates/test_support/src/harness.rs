//! One-call setup of a complete in-memory run.

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use cobalt_blob_engine::{CommitmentEngine, KzgBackend};
use cobalt_execution::ExecutionClient;
use cobalt_steps::{BlobTestContext, BlockProducer, ClientStarter};
use cobalt_txpool::TestAccounts;
use cobalt_types::fork::ForkConfig;
use color_eyre::eyre;
use tracing::debug;

use crate::{fake_kzg::FakeKzg, mock_el::MockExecutionClient, producer::MockBlockProducer};

pub const DEFAULT_CHAIN_ID: u64 = 7;
const DEFAULT_ACCOUNTS: u32 = 5;

/// Starts fresh [`MockExecutionClient`]s sharing the run's genesis.
///
/// Peering is only recorded. A client started without the producer never
/// learns about produced blocks, so it stays syncing.
#[derive(Debug)]
pub struct MockClientStarter {
    fork_config: ForkConfig,
    genesis_timestamp: u64,
    started: Mutex<Vec<(Arc<MockExecutionClient>, Option<String>)>>,
    counter: AtomicUsize,
}

impl MockClientStarter {
    pub fn new(fork_config: ForkConfig, genesis_timestamp: u64) -> Self {
        Self {
            fork_config,
            genesis_timestamp,
            started: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(1),
        }
    }

    /// Every client started so far with the name of its bootnode.
    pub fn started(&self) -> Vec<(Arc<MockExecutionClient>, Option<String>)> {
        self.started.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl ClientStarter for MockClientStarter {
    async fn start_client(
        &self,
        bootnode: Option<&ExecutionClient>,
    ) -> eyre::Result<ExecutionClient> {
        let node = Arc::new(MockExecutionClient::new(self.fork_config, self.genesis_timestamp)?);
        let name = format!("mock-el-{}", self.counter.fetch_add(1, Ordering::Relaxed));
        let bootnode = bootnode.map(|b| b.name().to_string());
        debug!(%name, ?bootnode, "Starting mock client");

        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((node.clone(), bootnode));
        Ok(ExecutionClient::from_node(name, node))
    }
}

/// Context plus handles to every mock behind it.
#[derive(Debug)]
pub struct Harness {
    pub ctx: Arc<BlobTestContext>,
    /// Client 0, also the block builder.
    pub client: Arc<MockExecutionClient>,
    pub producer: Arc<MockBlockProducer>,
    pub starter: Arc<MockClientStarter>,
}

impl Harness {
    pub fn new(fork_config: ForkConfig) -> eyre::Result<Self> {
        HarnessBuilder::new(fork_config).build()
    }

    pub fn builder(fork_config: ForkConfig) -> HarnessBuilder {
        HarnessBuilder::new(fork_config)
    }
}

/// Options for [`Harness`].
pub struct HarnessBuilder {
    fork_config: ForkConfig,
    genesis_timestamp: u64,
    chain_id: u64,
    accounts: u32,
    kzg: Arc<dyn KzgBackend>,
    rpc_timeout: Option<Duration>,
    customize_client: Option<Box<dyn FnOnce(MockExecutionClient) -> MockExecutionClient>>,
}

impl HarnessBuilder {
    pub fn new(fork_config: ForkConfig) -> Self {
        Self {
            fork_config,
            genesis_timestamp: 0,
            chain_id: DEFAULT_CHAIN_ID,
            accounts: DEFAULT_ACCOUNTS,
            kzg: Arc::new(FakeKzg),
            rpc_timeout: None,
            customize_client: None,
        }
    }

    pub fn genesis_timestamp(mut self, timestamp: u64) -> Self {
        self.genesis_timestamp = timestamp;
        self
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn accounts(mut self, count: u32) -> Self {
        self.accounts = count;
        self
    }

    pub fn kzg(mut self, kzg: Arc<dyn KzgBackend>) -> Self {
        self.kzg = kzg;
        self
    }

    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = Some(timeout);
        self
    }

    /// Adjusts client 0 before it is registered, e.g. to tamper with bundles.
    pub fn customize_client(
        mut self,
        f: impl FnOnce(MockExecutionClient) -> MockExecutionClient + 'static,
    ) -> Self {
        self.customize_client = Some(Box::new(f));
        self
    }

    pub fn build(self) -> eyre::Result<Harness> {
        let engine = CommitmentEngine::new(self.kzg);
        let mut node = MockExecutionClient::new(self.fork_config, self.genesis_timestamp)?
            .with_commitment_check(engine.clone());
        if let Some(customize) = self.customize_client {
            node = customize(node);
        }
        let client = Arc::new(node);
        let primary = ExecutionClient::from_node("mock-el-0", client.clone());

        let producer =
            Arc::new(MockBlockProducer::new(self.fork_config, client.genesis().clone()));
        producer.add_engine_client(primary.clone());

        let accounts = TestAccounts::standard(self.accounts)?;
        let mut ctx = BlobTestContext::new(
            self.fork_config,
            self.chain_id,
            engine,
            accounts,
            producer.clone(),
            vec![primary],
        );
        if let Some(timeout) = self.rpc_timeout {
            ctx = ctx.with_rpc_timeout(timeout);
        }

        let starter =
            Arc::new(MockClientStarter::new(self.fork_config, self.genesis_timestamp));
        Ok(Harness { ctx: Arc::new(ctx), client, producer, starter })
    }
}
