use std::{fmt, sync::Arc};

use crate::{engine_api::EngineApi, eth_rpc::EthRpc};

/// One execution client under test.
///
/// Bundles the Engine API side (block production and fork choice) and the
/// standard RPC side (transactions and receipts) of the same node.
#[derive(Clone)]
pub struct ExecutionClient {
    name: String,
    /// The Engine API client, used for block production and fork choice.
    pub engine: Arc<dyn EngineApi>,
    /// The standard JSON-RPC client, used for transactions and receipts.
    pub eth: Arc<dyn EthRpc>,
}

impl ExecutionClient {
    pub fn new(name: impl Into<String>, engine: Arc<dyn EngineApi>, eth: Arc<dyn EthRpc>) -> Self {
        Self { name: name.into(), engine, eth }
    }

    /// Builds a client from one object serving both APIs.
    pub fn from_node<N>(name: impl Into<String>, node: Arc<N>) -> Self
    where
        N: EngineApi + EthRpc + 'static,
    {
        Self { name: name.into(), engine: node.clone(), eth: node }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &dyn EngineApi {
        self.engine.as_ref()
    }

    pub fn eth(&self) -> &dyn EthRpc {
        self.eth.as_ref()
    }
}

impl fmt::Debug for ExecutionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionClient").field("name", &self.name).finish_non_exhaustive()
    }
}
