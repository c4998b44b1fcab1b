//! The consensus-layer block producer as the steps see it.
//!
//! The producer paces slots and drives one build/import cycle per call:
//!
//! ```text
//! forkchoiceUpdated(attrs) ──> on_payload_request
//!        │ get_payload_delay
//! getPayload ────────────────> on_get_payload
//! newPayload (all clients) ──> on_new_payload_broadcast
//! forkchoiceUpdated (all) ───> on_forkchoice_broadcast
//! ```
//!
//! Each hook runs after the producer has updated its latest payload and
//! bundle, so hooks read them through [`BlockProducer`] accessors.

use std::time::Duration;

use async_trait::async_trait;
use cobalt_execution::ExecutionClient;
use cobalt_types::{blob::BlobsBundle, payload::ExecutableData};

use crate::error::StepError;

/// Checkpoints a step registers for one production cycle.
///
/// An error from any hook aborts the cycle and is returned from
/// [`BlockProducer::produce_single_block`] unchanged.
#[async_trait]
pub trait BlockProcessHooks: Send {
    async fn on_payload_request(&mut self) -> Result<(), StepError> {
        Ok(())
    }

    async fn on_get_payload(&mut self) -> Result<(), StepError> {
        Ok(())
    }

    async fn on_new_payload_broadcast(&mut self) -> Result<(), StepError> {
        Ok(())
    }

    async fn on_forkchoice_broadcast(&mut self) -> Result<(), StepError> {
        Ok(())
    }
}

/// Hooks that do nothing, for cycles that only need to advance the chain.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

#[async_trait]
impl BlockProcessHooks for NoHooks {}

#[async_trait]
pub trait BlockProducer: Send + Sync {
    /// Runs one full build/import cycle, invoking `hooks` at each checkpoint.
    async fn produce_single_block(
        &self,
        hooks: &mut dyn BlockProcessHooks,
    ) -> Result<(), StepError>;

    /// The payload produced by the most recent cycle, if any.
    fn latest_payload_built(&self) -> Option<ExecutableData>;

    /// The bundle returned with the most recent payload, if any.
    fn latest_blobs_bundle(&self) -> Option<BlobsBundle>;

    /// Starts broadcasting payloads and fork choice to `client` as well.
    fn add_engine_client(&self, client: ExecutionClient);

    /// Wait between the build request and `getPayload`.
    fn get_payload_delay(&self) -> Duration;

    fn set_get_payload_delay(&self, delay: Duration);
}
