//! Per-run state shared by every step.

use std::{
    future::Future,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use cobalt_blob_engine::CommitmentEngine;
use cobalt_execution::ExecutionClient;
use cobalt_txpool::{TestAccounts, TestBlobTxPool};
use cobalt_types::fork::ForkConfig;
use color_eyre::eyre;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{error::StepError, producer::BlockProducer};

const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything a step may touch during a run.
///
/// Built once by the run bootstrap. Steps receive it behind an `Arc` so that
/// parallel siblings can share it; the pool and the client list are the only
/// parts mutated after construction.
pub struct BlobTestContext {
    pub fork_config: ForkConfig,
    pub chain_id: u64,
    pub engine: CommitmentEngine,
    pub accounts: TestAccounts,
    pub pool: Arc<TestBlobTxPool>,
    pub producer: Arc<dyn BlockProducer>,
    clients: RwLock<Vec<ExecutionClient>>,
    rpc_timeout: Duration,
    cancel: CancellationToken,
}

impl BlobTestContext {
    pub fn new(
        fork_config: ForkConfig,
        chain_id: u64,
        engine: CommitmentEngine,
        accounts: TestAccounts,
        producer: Arc<dyn BlockProducer>,
        clients: Vec<ExecutionClient>,
    ) -> Self {
        Self {
            fork_config,
            chain_id,
            engine,
            accounts,
            pool: Arc::new(TestBlobTxPool::new()),
            producer,
            clients: RwLock::new(clients),
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_pool(mut self, pool: Arc<TestBlobTxPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Ties every collaborator call of this run to `token`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn rpc_timeout(&self) -> Duration {
        self.rpc_timeout
    }

    /// The client at `index`.
    pub fn client(&self, index: usize) -> Result<ExecutionClient, StepError> {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients
            .get(index)
            .cloned()
            .ok_or(StepError::InvalidClientIndex { index, count: clients.len() })
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Registers a newly launched client and returns its index.
    pub fn add_client(&self, client: ExecutionClient) -> usize {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        clients.push(client);
        clients.len() - 1
    }

    /// Awaits `fut` under the run's timeout and cancellation.
    ///
    /// Only expiry and cancellation are mapped; whatever `fut` resolves to is
    /// handed back untouched so callers can inspect expected errors.
    pub async fn guard<T, F>(&self, call: &'static str, fut: F) -> Result<T, StepError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(call, "Call cancelled");
                Err(StepError::Cancelled { call })
            }
            res = tokio::time::timeout(self.rpc_timeout, fut) => {
                res.map_err(|_| StepError::Timeout { call, timeout: self.rpc_timeout })
            }
        }
    }

    /// [`guard`](Self::guard) for calls whose error is always a failure.
    pub async fn rpc<T, F>(&self, call: &'static str, fut: F) -> Result<T, StepError>
    where
        F: Future<Output = eyre::Result<T>>,
    {
        self.guard(call, fut).await?.map_err(|report| StepError::Rpc { call, report })
    }
}

impl std::fmt::Debug for BlobTestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobTestContext")
            .field("fork_config", &self.fork_config)
            .field("chain_id", &self.chain_id)
            .field("clients", &self.client_count())
            .field("rpc_timeout", &self.rpc_timeout)
            .finish_non_exhaustive()
    }
}
