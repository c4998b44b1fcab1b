use std::{fmt, sync::Arc};

use async_trait::async_trait;
use cobalt_execution::ExecutionClient;
use color_eyre::eyre;
use tracing::info;

use crate::{context::BlobTestContext, error::StepError, step::TestStep};

/// Brings up a new execution client for the run.
///
/// The client process itself is owned by whoever implements this; the steps
/// only keep track of the handle it returns.
#[async_trait]
pub trait ClientStarter: Send + Sync + fmt::Debug {
    /// Starts a client, peering it with `bootnode` when given.
    async fn start_client(&self, bootnode: Option<&ExecutionClient>)
    -> eyre::Result<ExecutionClient>;
}

/// Launches additional clients and registers them with the context.
#[derive(Clone, Debug)]
pub struct LaunchClients {
    pub starter: Arc<dyn ClientStarter>,
    /// 0 launches one client.
    pub client_count: u64,
    pub skip_connecting_to_bootnode: bool,
    pub skip_adding_to_producer: bool,
}

impl LaunchClients {
    pub fn new(starter: Arc<dyn ClientStarter>) -> Self {
        Self {
            starter,
            client_count: 0,
            skip_connecting_to_bootnode: false,
            skip_adding_to_producer: false,
        }
    }

    pub fn client_count(&self) -> u64 {
        self.client_count.max(1)
    }
}

#[async_trait]
impl TestStep for LaunchClients {
    async fn execute(&self, ctx: &Arc<BlobTestContext>) -> Result<(), StepError> {
        let bootnode =
            if self.skip_connecting_to_bootnode { None } else { Some(ctx.client(0)?) };

        for _ in 0..self.client_count() {
            let client = ctx
                .guard("start_client", self.starter.start_client(bootnode.as_ref()))
                .await?
                .map_err(StepError::ClientStart)?;

            if !self.skip_adding_to_producer {
                ctx.producer.add_engine_client(client.clone());
            }
            let index = ctx.add_client(client.clone());
            info!(
                index,
                client = client.name(),
                producing = !self.skip_adding_to_producer,
                "Launched client"
            );
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("Launch {} new engine client(s)", self.client_count())
    }
}
