//! The `NewPayloads` step and the checks it hooks into each production cycle.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use cobalt_blob_engine::BlobId;
use cobalt_execution::EngineMethod;
use cobalt_types::{
    aliases::VersionedHash, constants::BLOB_COMMITMENT_VERSION_KZG, payload::ExecutableData,
};
use itertools::Itertools;
use tracing::{debug, info};

use crate::{
    context::BlobTestContext,
    customizer::PayloadCustomizer,
    error::StepError,
    expect::NewPayloadExpectation,
    producer::BlockProcessHooks,
    step::TestStep,
    verify::{blob_data_in_payload, verify_blob_bundle, verify_payload},
    versioned_hashes::VersionedHashes,
};

/// Produces `payload_count` blocks and checks blob handling in each.
///
/// Per cycle the built payload's bundle is matched against the pool, a test
/// `newPayload` is sent to client 0 (optionally with tampered hashes or
/// payload contents) and checked against `expectation`, and after fork choice
/// the blob gas fields and receipts are verified.
#[derive(Clone, Debug, Default)]
pub struct NewPayloads {
    /// 0 produces one payload.
    pub payload_count: u64,
    /// Blobs every produced payload must include.
    pub expected_included_blob_count: u64,
    /// Blobs that must appear somewhere in each payload.
    pub expected_blobs: Vec<BlobId>,
    /// Overrides the producer's wait before `getPayload` for this step only.
    pub get_payload_delay: Option<Duration>,
    /// Replaces the hashes derived from the bundle.
    pub versioned_hashes: Option<VersionedHashes>,
    pub payload_customizer: Option<Arc<dyn PayloadCustomizer>>,
    /// `newPayload` version; derived from the payload timestamp when unset.
    pub version: Option<u8>,
    pub expectation: NewPayloadExpectation,
}

impl NewPayloads {
    pub fn payload_count(&self) -> u64 {
        self.payload_count.max(1)
    }

    async fn produce(&self, ctx: &BlobTestContext) -> Result<(), StepError> {
        let count = self.payload_count();
        let mut previous = ctx.producer.latest_payload_built();

        for payload in 0..count {
            let mut cycle = PayloadCycle { step: self, ctx, payload, count, previous };
            ctx.producer.produce_single_block(&mut cycle).await?;
            previous = cycle.previous;
            info!("Correctly produced payload {}/{}", payload + 1, count);
        }
        Ok(())
    }
}

#[async_trait]
impl TestStep for NewPayloads {
    async fn execute(&self, ctx: &Arc<BlobTestContext>) -> Result<(), StepError> {
        let original_delay = self.get_payload_delay.map(|delay| {
            let original = ctx.producer.get_payload_delay();
            ctx.producer.set_get_payload_delay(delay);
            original
        });

        let result = self.produce(ctx).await;

        if let Some(delay) = original_delay {
            ctx.producer.set_get_payload_delay(delay);
        }
        result
    }

    fn description(&self) -> String {
        let mut description = format!(
            "NewPayloads: {} payloads, {} blobs expected",
            self.payload_count(),
            self.expected_included_blob_count
        );
        if let Some(hashes) = &self.versioned_hashes {
            description.push_str(&format!(", {hashes}"));
        }
        if !self.expected_blobs.is_empty() {
            description.push_str(&format!(", blobs [{}]", self.expected_blobs.iter().join(", ")));
        }
        description
    }
}

/// Hooks for one cycle of [`NewPayloads`].
struct PayloadCycle<'a> {
    step: &'a NewPayloads,
    ctx: &'a BlobTestContext,
    payload: u64,
    count: u64,
    /// Payload the excess blob gas of this cycle derives from. Replaced by
    /// this cycle's payload once fork choice has moved.
    previous: Option<ExecutableData>,
}

impl PayloadCycle<'_> {
    fn latest_payload(&self) -> Result<ExecutableData, StepError> {
        self.ctx.producer.latest_payload_built().ok_or(StepError::NoPayloadAvailable)
    }

    fn fail(&self, stage: &'static str) -> impl FnOnce(StepError) -> StepError {
        let (payload, count) = (self.payload, self.count);
        move |err| err.in_cycle(stage, payload, count)
    }

    fn submitted_hashes(&self) -> Result<Option<Vec<VersionedHash>>, StepError> {
        match &self.step.versioned_hashes {
            Some(hashes) => hashes
                .versioned_hashes(&self.ctx.engine)
                .map_err(StepError::from)
                .map_err(self.fail("getting modified versioned hashes")),
            None => Ok(self
                .ctx
                .producer
                .latest_blobs_bundle()
                .map(|bundle| bundle.versioned_hashes(BLOB_COMMITMENT_VERSION_KZG))),
        }
    }
}

#[async_trait]
impl BlockProcessHooks for PayloadCycle<'_> {
    async fn on_get_payload(&mut self) -> Result<(), StepError> {
        let payload = self.latest_payload()?;
        if !self.ctx.fork_config.is_cancun(payload.timestamp) {
            return Ok(());
        }

        let bundle = self
            .ctx
            .producer
            .latest_blobs_bundle()
            .ok_or(StepError::MissingBlobsBundle)
            .map_err(self.fail("getting blobs bundle"))?;

        let (_, entries) = blob_data_in_payload(&self.ctx.pool, &payload)
            .map_err(self.fail("retrieving blob bundle"))?;

        verify_blob_bundle(
            self.step.expected_included_blob_count,
            &self.step.expected_blobs,
            &entries,
            &bundle,
        )
        .map_err(self.fail("verifying blob bundle"))
    }

    async fn on_new_payload_broadcast(&mut self) -> Result<(), StepError> {
        let mut payload = self.latest_payload()?;
        let mut hashes = self.submitted_hashes()?;

        if let Some(customizer) = &self.step.payload_customizer {
            payload = customizer
                .customize_payload(&payload)
                .map_err(StepError::from)
                .map_err(self.fail("customizing payload"))?;
        }

        let version = self
            .step
            .version
            .unwrap_or_else(|| self.ctx.fork_config.new_payload_version(payload.timestamp));
        if version < 3 {
            hashes = None;
        }
        let call = EngineMethod::NewPayload
            .name(version)
            .map_err(StepError::from)
            .map_err(self.fail("sending new payload"))?;
        debug!(
            call,
            block_hash = %payload.block_hash,
            hashes = ?hashes.as_ref().map(Vec::len),
            "Sending test newPayload"
        );

        let client = self.ctx.client(0)?;
        let result = self
            .ctx
            .guard(call, client.engine().new_payload(version, &payload, hashes))
            .await
            .map_err(self.fail("sending new payload"))?;
        self.step.expectation.check(call, result).map_err(self.fail("sending new payload"))
    }

    async fn on_forkchoice_broadcast(&mut self) -> Result<(), StepError> {
        let payload = self.latest_payload()?;

        let (blob_txs, _) = blob_data_in_payload(&self.ctx.pool, &payload)
            .map_err(self.fail("retrieving blob bundle"))?;

        let client = self.ctx.client(0)?;
        verify_payload(
            self.ctx,
            &client,
            &self.ctx.fork_config,
            self.step.expected_included_blob_count,
            &blob_txs,
            &payload,
            self.previous.as_ref(),
        )
        .await
        .map_err(self.fail("verifying payload"))?;

        self.previous = Some(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_mentions_hash_overrides() {
        let step = NewPayloads { expected_included_blob_count: 2, ..Default::default() };
        assert_eq!(step.description(), "NewPayloads: 1 payloads, 2 blobs expected");

        let step = NewPayloads {
            payload_count: 3,
            versioned_hashes: Some(VersionedHashes::of([BlobId(1), BlobId(0)])),
            ..Default::default()
        };
        assert_eq!(
            step.description(),
            "NewPayloads: 3 payloads, 0 blobs expected, VersionedHashes: [1, 0]"
        );
    }
}
